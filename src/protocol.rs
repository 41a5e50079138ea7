//! Wire format for one send cycle: a text header announcing the frame
//! dimensions, followed by one binary message per rendered view.
//!
//! The peer's replies are never parsed; any inbound message is treated purely
//! as "send the next frame".

use anyhow::{Result, anyhow};

/// Header text frame announcing the dimensions of the binary frames that
/// follow. Exactly `"{width};{height}"`, nothing else.
pub fn dimensions_header(width: u32, height: u32) -> String {
    format!("{width};{height}")
}

/// Inverse of [`dimensions_header`], for the receiving side and tests.
pub fn parse_dimensions_header(text: &str) -> Result<(u32, u32)> {
    let Some((w, h)) = text.split_once(';') else {
        return Err(anyhow!("malformed dimensions header: {text:?}"));
    };
    let width: u32 = w
        .parse()
        .map_err(|_| anyhow!("bad width in dimensions header: {text:?}"))?;
    let height: u32 = h
        .parse()
        .map_err(|_| anyhow!("bad height in dimensions header: {text:?}"))?;
    Ok((width, height))
}
