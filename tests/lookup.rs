//! End-to-end lookups against real directories on disk.

use hooknav::config::load_config_from;
use hooknav::document::position_at;
use hooknav::logging::{Level, MemoryLog, OutputLog};
use hooknav::{DefinitionProvider, Document, LookupError, NotFoundReason};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const USERS_API: &str = r#"export const usersApi = api.injectEndpoints({
  endpoints: (build) => ({
    getUsers: build.query<User[], void>({ query: () => '/users' }),
    "updateUser": build.mutation<User, Partial<User>>({
      query: (body) => ({ url: `/users/${body.id}`, method: 'PATCH', body }),
    }),
  }),
});
"#;

fn write(root: &Path, rel: &str, body: &str) {
    let p = root.join(rel);
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(p, body).unwrap();
}

/// Workspace config only; the user-level file of whoever runs the tests is left out.
fn provider_for(root: &Path, log: Arc<dyn OutputLog>) -> DefinitionProvider {
    let config = load_config_from(root, None, log.as_ref());
    DefinitionProvider::with_config(root, config, log)
}

fn cursor_on(doc: &Document, needle: &str) -> hooknav::Position {
    position_at(&doc.text, doc.text.find(needle).expect("needle in doc") + 1)
}

#[tokio::test]
async fn resolves_within_current_document() {
    let tmp = TempDir::new().unwrap();
    let provider = provider_for(tmp.path(), MemoryLog::new());
    let doc = Document::new(
        tmp.path().join("src/alerts.ts"),
        "const { data } = useGetSingleAlertQuery(id);\n\nconst api = createApi({\n  endpoints: (builder) => ({\n    getSingleAlert: builder.query({ query: (id) => `/a/${id}` }),\n  }),\n});\n",
    );

    let loc = provider
        .provide_definition(&doc, cursor_on(&doc, "useGetSingleAlertQuery"), &CancellationToken::new())
        .await
        .expect("found in current document");
    assert_eq!(loc.path, doc.path);
    assert_eq!((loc.position.line, loc.position.column), (4, 4));
}

#[tokio::test]
async fn resolves_through_workspace_phase() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "src/services/usersApi.ts", USERS_API);
    let page = "src/pages/Users.tsx";
    write(tmp.path(), page, "const [update] = useUpdateUserMutation();\n");

    let provider = provider_for(tmp.path(), MemoryLog::new());
    let doc = Document::open(&tmp.path().join(page)).unwrap();
    let loc = provider
        .go_to_endpoint(&doc, cursor_on(&doc, "useUpdateUserMutation"))
        .await
        .unwrap();
    assert!(loc.path.ends_with("src/services/usersApi.ts"));
    assert_eq!((loc.position.line, loc.position.column), (3, 4));
}

#[tokio::test]
async fn declarations_in_excluded_dirs_are_not_found() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "node_modules/shared/api/usersApi.ts", USERS_API);
    write(tmp.path(), "dist/api/usersApi.js", USERS_API);

    let provider = provider_for(tmp.path(), MemoryLog::new());
    let err = provider.go_to_hook(None, "useGetUsersQuery").await.unwrap_err();
    assert!(matches!(
        err,
        LookupError::EndpointNotFound { reason: NotFoundReason::Exhausted, .. }
    ));
}

#[tokio::test]
async fn missing_endpoint_is_not_found_within_budget() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), ".hooknav.json", r#"{ "timeoutMs": 300 }"#);
    write(tmp.path(), "src/api/usersApi.ts", USERS_API);

    let log = MemoryLog::new();
    let provider = provider_for(tmp.path(), log.clone());
    assert_eq!(provider.config().timeout_ms, 300);

    let started = Instant::now();
    let err = provider.go_to_hook(None, "useGetNothingQuery").await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    match err {
        LookupError::EndpointNotFound { endpoint, reason } => {
            assert_eq!(endpoint, "getNothing");
            assert!(matches!(reason, NotFoundReason::Exhausted | NotFoundReason::TimedOut));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!log.contains(Level::Error, "getNothing"));
}

#[tokio::test]
async fn workspace_config_overrides_search_patterns() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "src/store/endpoints/users.ts", USERS_API);

    let provider = provider_for(tmp.path(), MemoryLog::new());
    assert!(provider.go_to_hook(None, "useGetUsersQuery").await.is_err());

    write(tmp.path(), ".hooknav.json", r#"{ "searchPatterns": ["src/store/**/*.ts"] }"#);
    let provider = provider_for(tmp.path(), MemoryLog::new());
    let loc = provider.go_to_hook(None, "useGetUsersQuery").await.unwrap();
    assert!(loc.path.ends_with("src/store/endpoints/users.ts"));
    assert_eq!(loc.position.line, 2);
}
