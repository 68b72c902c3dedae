use regex::Regex;

use crate::model::Config;

/// Non-exhaustive validation pass, grounded on
/// `original_source/td2/types.go`'s `validateConfig`. Returns whether any
/// problem found is fatal, plus the full list of problems (fatal and
/// warning) for the caller to log.
pub fn validate(config: &Config) -> (bool, Vec<String>) {
    let mut problems = Vec::new();
    let mut fatal = false;

    if config.enable_dashboard && config.dashboard_listen.parse::<std::net::SocketAddr>().is_err()
    {
        fatal = true;
        problems.push(format!(
            "error: the dashboard listen address {:?} does not appear to be valid",
            config.dashboard_listen
        ));
    }

    if config.prometheus_enabled
        && config.prometheus_listen.parse::<std::net::SocketAddr>().is_err()
    {
        fatal = true;
        problems.push(format!(
            "error: the prometheus listen address {:?} does not appear to be valid",
            config.prometheus_listen
        ));
    }

    // A PagerDuty v2 Events API key never contains these characters; an
    // OAuth token (the wrong credential for this integration) usually does.
    let oauth_shaped = Regex::new(r"[+_-]").expect("static regex");

    if config.chains.is_empty() {
        problems.push("warn: no chains configured, nothing to monitor".to_string());
    }

    for (name, spec) in &config.chains {
        if spec.nodes.is_empty() {
            fatal = true;
            problems.push(format!("error: {name} has no nodes configured"));
        }
        if spec.operator_address.is_empty() {
            fatal = true;
            problems.push(format!("error: {name} has no valoper_address configured"));
        }

        if spec.alerts.pagerduty_enabled {
            match &spec.alerts.pagerduty_routing_key {
                Some(key) if oauth_shaped.is_match(key) => {
                    fatal = true;
                    problems.push(format!(
                        "error: {name}'s PagerDuty key appears to be an OAuth token, not a V2 Events API key"
                    ));
                }
                None => {
                    problems.push(format!(
                        "warn: {name} is configured for pagerduty alerts, but no routing key is set"
                    ));
                }
                _ => {}
            }
        }
        if spec.alerts.discord_enabled && spec.alerts.discord_webhook.is_none() {
            problems.push(format!(
                "warn: {name} is configured for discord alerts, but no webhook is set"
            ));
        }
        if spec.alerts.slack_enabled && spec.alerts.slack_webhook.is_none() {
            problems.push(format!(
                "warn: {name} is configured for slack alerts, but no webhook is set"
            ));
        }
        if spec.alerts.telegram_enabled
            && (spec.alerts.telegram_bot_token.is_none() || spec.alerts.telegram_channel.is_none())
        {
            problems.push(format!(
                "warn: {name} is configured for telegram alerts, but the bot token or channel is not set"
            ));
        }
    }

    (fatal, problems)
}
