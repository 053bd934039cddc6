//! Drives the MCP server the way a host does: JSON lines in, JSON lines out.

#![allow(clippy::unwrap_used)]

use cantonese_mcp::config::Config;
use cantonese_mcp::mcp::{LATEST_PROTOCOL_VERSION, McpError, McpServer};
use cantonese_mcp::tools::build_registry;
use serde_json::{Value, json};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::task::JoinHandle;

struct Host {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    server: JoinHandle<Result<(), McpError>>,
}

impl Host {
    fn start(config: &Config, working_dir: &Path) -> Self {
        let registry = build_registry(config).unwrap();
        let server = McpServer::new(registry).with_working_directory(working_dir.to_path_buf());

        let (input, server_in) = tokio::io::duplex(256 * 1024);
        let (server_out, output) = tokio::io::duplex(256 * 1024);
        let server = tokio::spawn(server.serve(server_in, server_out));

        Self {
            input,
            output: BufReader::new(output).lines(),
            server,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        self.input.write_all(line.as_bytes()).await.unwrap();
        self.input.write_all(b"\n").await.unwrap();
    }

    async fn recv(&mut self) -> Value {
        let line = self.output.next_line().await.unwrap().expect("server closed output");
        serde_json::from_str(&line).unwrap()
    }

    async fn request(&mut self, id: u64, method: &str, params: Value) -> Value {
        let msg = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        self.send_raw(&msg.to_string()).await;
        let reply = self.recv().await;
        assert_eq!(reply["id"], json!(id));
        reply
    }

    async fn shutdown(self) {
        drop(self.input);
        self.server.await.unwrap().unwrap();
    }
}

fn config_for(base_url: &str, api_key: Option<&str>, output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.api.base_url = base_url.to_string();
    config.api.api_key = api_key.map(str::to_string);
    config.output.directory = Some(output_dir.to_path_buf());
    config
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = Host::start(&config_for("http://127.0.0.1:9", Some("k"), dir.path()), dir.path());

    let init = host
        .request(
            1,
            "initialize",
            json!({
                "protocolVersion": LATEST_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": "integration", "version": "0.0.1" }
            }),
        )
        .await;
    assert_eq!(init["result"]["protocolVersion"], json!(LATEST_PROTOCOL_VERSION));
    assert!(init["result"]["capabilities"]["tools"].is_object());

    host.send_raw(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
        .await;

    let list = host.request(2, "tools/list", json!({})).await;
    let tools = list["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["speech_to_text", "text_to_speech"]);
    for tool in tools {
        assert_eq!(tool["inputSchema"]["type"], json!("object"));
    }

    let pong = host.request(3, "ping", json!({})).await;
    assert_eq!(pong["result"], json!({}));

    host.shutdown().await;
}

#[tokio::test]
async fn test_text_to_speech_call_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut remote = mockito::Server::new_async().await;
    let mock = remote
        .mock("POST", "/text-to-speech")
        .match_body(mockito::Matcher::PartialJson(json!({
            "api_key": "integration-key",
            "text": "早晨",
            "output_extension": "mp3"
        })))
        .with_status(200)
        .with_body(vec![0xFFu8, 0xFB, 0x90, 0x00])
        .create_async()
        .await;

    let mut host = Host::start(
        &config_for(&remote.url(), Some("integration-key"), dir.path()),
        dir.path(),
    );

    let reply = host
        .request(
            10,
            "tools/call",
            json!({
                "name": "text_to_speech",
                "arguments": { "text": "早晨", "format": "mp3", "output_path": "out/morning.mp3" }
            }),
        )
        .await;

    mock.assert_async().await;
    let result = &reply["result"];
    assert_eq!(result["isError"], json!(false), "{}", result);

    let expected = dir.path().join("out").join("morning.mp3");
    assert_eq!(std::fs::read(&expected).unwrap(), vec![0xFFu8, 0xFB, 0x90, 0x00]);
    assert_eq!(result["structuredContent"]["success"], json!(true));
    assert_eq!(
        result["structuredContent"]["output_path"],
        json!(expected.display().to_string())
    );

    host.shutdown().await;
}

#[tokio::test]
async fn test_speech_to_text_missing_file_is_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut remote = mockito::Server::new_async().await;
    let mock = remote
        .mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut host = Host::start(&config_for(&remote.url(), Some("k"), dir.path()), dir.path());
    let reply = host
        .request(
            4,
            "tools/call",
            json!({ "name": "speech_to_text", "arguments": { "path": "nowhere.wav" } }),
        )
        .await;

    let result = &reply["result"];
    assert_eq!(result["isError"], json!(true));
    assert!(
        result["content"][0]["text"]
            .as_str()
            .unwrap()
            .starts_with("File not found at path")
    );
    assert_eq!(result["structuredContent"]["code"], json!("FILE_NOT_FOUND"));
    mock.assert_async().await;

    host.shutdown().await;
}

#[tokio::test]
async fn test_invalid_arguments_are_tool_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = Host::start(&config_for("http://127.0.0.1:9", Some("k"), dir.path()), dir.path());

    let reply = host
        .request(
            5,
            "tools/call",
            json!({ "name": "text_to_speech", "arguments": { "text": "" } }),
        )
        .await;
    assert_eq!(reply["result"]["isError"], json!(true));

    let reply = host
        .request(6, "tools/call", json!({ "name": "sing", "arguments": {} }))
        .await;
    assert_eq!(reply["result"]["isError"], json!(true));
    assert_eq!(reply["result"]["content"][0]["text"], json!("Unknown tool: sing"));

    host.shutdown().await;
}

#[tokio::test]
async fn test_protocol_errors() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = Host::start(&config_for("http://127.0.0.1:9", None, dir.path()), dir.path());

    host.send_raw("this is not json").await;
    let reply = host.recv().await;
    assert_eq!(reply["id"], Value::Null);
    assert_eq!(reply["error"]["code"], json!(-32700));

    let reply = host.request(7, "prompts/list", json!({})).await;
    assert_eq!(reply["error"]["code"], json!(-32601));

    let reply = host.request(8, "tools/call", json!({ "arguments": {} })).await;
    assert_eq!(reply["error"]["code"], json!(-32602));

    host.shutdown().await;
}
