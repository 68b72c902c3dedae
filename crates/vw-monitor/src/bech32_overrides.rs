//! Small built-in table of chains whose consensus-address bech32 prefix does
//! not follow the usual `<prefix>valcons` convention, keyed on the
//! account-side bech32 prefix (the characters before the bech32 `1`
//! separator in the operator address). Extensible by config.

/// Looks up the `valcons`-equivalent prefix for an account prefix that
/// doesn't derive cleanly by splitting on `"valoper"`.
pub fn lookup(account_prefix: &str, extra: &[(String, String)]) -> Option<String> {
    extra
        .iter()
        .find(|(prefix, _)| prefix == account_prefix)
        .map(|(_, valcons)| valcons.clone())
        .or_else(|| built_in(account_prefix))
}

fn built_in(account_prefix: &str) -> Option<String> {
    match account_prefix {
        // Chains observed in the wild shipping a non-standard consensus
        // prefix distinct from `<prefix>valcons`.
        "terra" => Some("terravalcons".to_string()),
        "persistence" => Some("persistencevalcons".to_string()),
        _ => None,
    }
}
