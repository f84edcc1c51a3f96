fn main() {
    println!("Run `cargo test -p bridge-compat` to execute bridge compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use saveas_protocol::{
        Action, BridgeReply, BridgeRequest, ErrorKind, ReplyStatus, SaveRequest,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values.
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  bridge: {fixture}\n  host:   {reserialized}"
        );
        parsed
    }

    fn save_args(name: &str) -> SaveRequest {
        let request: BridgeRequest = roundtrip_test(name);
        assert_eq!(request.action().unwrap(), Action::SaveBase64);
        SaveRequest::from_args(&request.args)
            .unwrap_or_else(|e| panic!("{name} rejected: {e}"))
    }

    // --- Requests ---

    #[test]
    fn fixture_request_save_base64() {
        let req = save_args("request_save_base64.json");
        assert_eq!(req.filename, "report.pdf");
        assert_eq!(req.mime_type.as_deref(), Some("application/pdf"));

        let bytes = saveas_file_ops::decode_payload(&req.payload).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert_eq!(bytes.len(), 15);
    }

    #[test]
    fn fixture_request_data_uri() {
        let req = save_args("request_save_data_uri.json");
        assert_eq!(req.filename, "greeting");
        assert!(req.mime_type.is_none());
        assert_eq!(
            saveas_file_ops::decode_payload(&req.payload).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn fixture_request_minimal_defaults() {
        let req = save_args("request_save_minimal.json");
        assert_eq!(req.filename, saveas_protocol::DEFAULT_FILENAME);
        assert!(req.mime_type.is_none());
    }

    #[test]
    fn fixture_request_reset() {
        let request: BridgeRequest = roundtrip_test("request_reset.json");
        assert_eq!(request.action().unwrap(), Action::Reset);
    }

    #[test]
    fn request_without_args_field() {
        let request = BridgeRequest::from_line(r#"{"id":"a","action":"reset"}"#).unwrap();
        assert!(request.args.is_empty());
    }

    // --- Replies ---

    #[test]
    fn fixture_reply_pending() {
        let reply: BridgeReply = roundtrip_test("reply_pending.json");
        assert_eq!(reply, BridgeReply::pending("req-1"));
        assert!(!reply.status.is_terminal());
    }

    #[test]
    fn fixture_reply_progress() {
        let reply: BridgeReply = roundtrip_test("reply_progress.json");
        assert_eq!(reply, BridgeReply::progress("req-1", 42));
    }

    #[test]
    fn fixture_reply_ok() {
        let reply: BridgeReply = roundtrip_test("reply_ok.json");
        assert_eq!(reply.status, ReplyStatus::Ok);
        let result = reply.result.unwrap();
        assert_eq!(result.display_name, "report (2).pdf");
        assert_eq!(result.requested_name, "report.pdf");
        assert_eq!(result.bytes_written, 15);
    }

    #[test]
    fn fixture_reply_ok_without_digest() {
        let reply: BridgeReply = roundtrip_test("reply_ok_moved.json");
        assert!(reply.result.unwrap().sha256.is_empty());
    }

    #[test]
    fn fixture_reply_error() {
        let reply: BridgeReply = roundtrip_test("reply_error.json");
        assert!(reply.status.is_terminal());
        assert_eq!(
            reply,
            BridgeReply::error("req-1", ErrorKind::UserCancelled, "User cancelled")
        );
    }

    #[test]
    fn fixture_error_kinds() {
        let kinds: Vec<ErrorKind> = roundtrip_test("error_kinds.json");
        assert_eq!(kinds.len(), 7);
        for kind in kinds {
            let wire = serde_json::to_value(kind).unwrap();
            assert_eq!(wire, kind.as_str());
        }
    }

    #[test]
    fn reply_lines_are_single_line() {
        let line = BridgeReply::error("x", ErrorKind::Io, "disk\nfull")
            .to_line()
            .unwrap();
        assert!(!line.contains('\n'));
    }
}
