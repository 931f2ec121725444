use std::io::{self, BufRead, Write};

use ctxstash::engine::AppState;
use ctxstash::shared::config::load_settings;
use ctxstash::{logging, tools};
use serde_json::Value;
use tracing::info;

/// Line-oriented JSON tool server: one `{"tool": ..., "params": {...}}`
/// request per stdin line, one JSON response per stdout line. The host
/// process owns transport and concurrency; the core runs requests to
/// completion in order.
fn main() -> anyhow::Result<()> {
    let settings = load_settings()?;
    logging::init(&settings.logging)?;

    let mut state = AppState::new(settings)?;
    info!("ctxstash ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(request) => {
                let tool = request
                    .get("tool")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let params = request.get("params").cloned().unwrap_or(Value::Null);
                let params = if params.is_null() {
                    Value::Object(Default::default())
                } else {
                    params
                };
                tools::dispatch(&mut state, &tool, params)
            }
            Err(err) => {
                tools::ToolError::InvalidParameter(format!("invalid request: {err}")).to_response()
            }
        };

        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    }

    Ok(())
}
