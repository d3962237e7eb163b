use regex::Regex;
use std::sync::OnceLock;

fn hook_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Alternation order matters: `Query` is tried before `LazyQuery`.
    RE.get_or_init(|| Regex::new(r"^use(.+?)(Query|LazyQuery|Mutation)$").unwrap())
}

/// Map a generated hook name to the endpoint it was generated from.
///
/// `useGetSingleAlertQuery` → `getSingleAlert`, `useUpdateUserMutation` → `updateUser`.
/// Anything that is not shaped like a generated hook yields `None`.
pub fn endpoint_name_for_hook(word: &str) -> Option<String> {
    let caps = hook_regex().captures(word)?;
    let middle = caps.get(1)?.as_str();

    let mut chars = middle.chars();
    let first = chars.next()?;
    let mut out = String::with_capacity(middle.len());
    out.push(first.to_ascii_lowercase());
    out.push_str(chars.as_str());
    Some(out)
}
