//! Child side of the sandbox exchange.
//!
//! Reads one request from stdin, tightens its own resource limits, runs the
//! script and writes the result object to stdout. Never logs to stdout.

use std::io::{Read, Write};

use super::limits::ResourceLimiter;
use super::protocol::{
    SandboxRequest, EXIT_BAD_REQUEST, EXIT_CONTRACT_VIOLATION, EXIT_OK, EXIT_SCRIPT_ERROR,
};
use super::script::run_script;

const EXIT_IO: i32 = 1;

pub fn run_child<R, W, E>(
    mut stdin: R,
    mut stdout: W,
    mut stderr: E,
    limiter: &dyn ResourceLimiter,
) -> i32
where
    R: Read,
    W: Write,
    E: Write,
{
    let mut raw = Vec::new();
    if let Err(e) = stdin.read_to_end(&mut raw) {
        let _ = writeln!(stderr, "failed to read request: {e}");
        return EXIT_IO;
    }

    let req: SandboxRequest = match serde_json::from_slice(&raw) {
        Ok(req) => req,
        Err(e) => {
            let _ = writeln!(stderr, "malformed request: {e}");
            return EXIT_BAD_REQUEST;
        }
    };

    // The parent already applied these in pre_exec; this only tightens further.
    if let Err(e) = limiter.apply(&req.limits()) {
        let _ = writeln!(stderr, "warning: could not apply {} limits: {e}", limiter.name());
    }

    match run_script(&req.script, &req.payload) {
        Ok(result) => {
            let written = serde_json::to_writer(&mut stdout, &result)
                .map_err(std::io::Error::from)
                .and_then(|_| stdout.write_all(b"\n"))
                .and_then(|_| stdout.flush());
            match written {
                Ok(()) => EXIT_OK,
                Err(e) => {
                    let _ = writeln!(stderr, "failed to write result: {e}");
                    EXIT_IO
                }
            }
        }
        Err(e) => {
            let _ = writeln!(stderr, "{e}");
            if e.is_contract_violation() {
                EXIT_CONTRACT_VIOLATION
            } else {
                EXIT_SCRIPT_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::limits::UnsupportedLimiter;
    use serde_json::json;

    fn run(input: &str) -> (i32, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run_child(input.as_bytes(), &mut out, &mut err, &UnsupportedLimiter);
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    fn request(script: &str) -> String {
        json!({"script": script, "payload": {"name": "pkg"}, "heap_mb": 64, "cpu_s": 1})
            .to_string()
    }

    #[test]
    fn writes_result_object() {
        let (code, out, err) = run(&request("result = {ok: true, name: payload.name}"));
        assert_eq!(code, EXIT_OK, "{err}");
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v, json!({"ok": true, "name": "pkg"}));
    }

    #[test]
    fn malformed_request() {
        let (code, out, err) = run("{not json");
        assert_eq!(code, EXIT_BAD_REQUEST);
        assert!(out.is_empty());
        assert!(err.contains("malformed request"));
    }

    #[test]
    fn script_failures_go_to_stderr() {
        let (code, out, err) = run(&request("fail \"nope\""));
        assert_eq!(code, EXIT_SCRIPT_ERROR);
        assert!(out.is_empty());
        assert!(err.contains("nope"));

        let (code, _, _) = run(&request("result = [1]"));
        assert_eq!(code, EXIT_CONTRACT_VIOLATION);
    }
}
