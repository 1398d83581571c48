use portal_core::DeviceClass;

/// Classifies a user agent by substring, first match wins.
///
/// The order matters: a mobile bot counts as mobile.
pub fn classify(user_agent: &str) -> DeviceClass {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("mobile") {
        DeviceClass::Mobile
    } else if ua.contains("tablet") {
        DeviceClass::Tablet
    } else if ua.contains("bot") {
        DeviceClass::Bot
    } else if ua.contains("curl") {
        DeviceClass::Curl
    } else if ua.contains("wget") {
        DeviceClass::Wget
    } else {
        DeviceClass::Desktop
    }
}
