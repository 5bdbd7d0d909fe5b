//! Topic subject layout
//!
//! Devices publish telemetry on subjects shaped like
//! `/devices/{device}/controls/{parameter}`, and commands travel back on the
//! same layout. The transport listener uses [`parse_topic`] to honor its
//! contract of never invoking the ingest callback for malformed subjects;
//! the command path uses [`command_topic`] to address a device parameter.

use crate::error::{Error, Result};
use crate::hub::PointKey;

/// Parse an inbound topic into a device/parameter pair
///
/// Leading slashes and empty segments are tolerated, matching broker
/// behavior for subjects like `//devices/boiler//controls/temp`.
pub fn parse_topic(topic: &str) -> Result<PointKey> {
    let parts: Vec<&str> = topic.split('/').filter(|p| !p.is_empty()).collect();

    match parts.as_slice() {
        ["devices", device, "controls", parameter] => {
            Ok(PointKey::new(*device, *parameter))
        }
        _ => Err(Error::MalformedTopic(topic.to_string())),
    }
}

/// Format the command topic for a device parameter
pub fn command_topic(device: &str, parameter: &str) -> String {
    format!("/devices/{}/controls/{}", device, parameter)
}
