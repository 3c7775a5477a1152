//! Minimal `text/event-stream` body parsing for POST responses.

/// Extract complete `data:` payloads from an SSE buffer.
///
/// Events are delimited by a blank line. Multiple `data:` lines in one
/// event are joined with `\n`. The buffer is drained in place; a trailing
/// partial event stays for the next call.
pub(crate) fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();

    // Accept both LF and CRLF framing.
    if buffer.contains('\r') {
        *buffer = buffer.replace("\r\n", "\n");
    }

    while let Some(pos) = buffer.find("\n\n") {
        let block: String = buffer.drain(..pos).collect();
        buffer.drain(..2);

        let data: Vec<&str> = block
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(|d| d.strip_prefix(' ').unwrap_or(d))
            .collect();
        if !data.is_empty() {
            let joined = data.join("\n");
            if !joined.trim().is_empty() {
                payloads.push(joined);
            }
        }
    }

    payloads
}
