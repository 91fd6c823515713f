//! Runtime tests driving [`crate::run`] against an in-process peer.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::process::ExitCode;
use std::thread::{self, JoinHandle};

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;

use crate::run;

struct PeerSocket {
    dir: TempDir,
}

impl PeerSocket {
    fn path(&self) -> String {
        self.dir.path().join("peer.sock").to_string_lossy().into_owned()
    }

    /// Accepts one connection and hands it to `script`.
    fn serve<F>(&self, script: F) -> JoinHandle<()>
    where
        F: FnOnce(BufReader<UnixStream>, UnixStream) + Send + 'static,
    {
        let listener = UnixListener::bind(self.path()).expect("bind peer socket");
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept client");
            let writer = stream.try_clone().expect("clone peer stream");
            script(BufReader::new(stream), writer);
        })
    }
}

#[fixture]
fn peer() -> PeerSocket {
    PeerSocket {
        dir: TempDir::new().expect("create socket directory"),
    }
}

fn next_command(reader: &mut BufReader<UnixStream>) -> Value {
    let mut line = String::new();
    reader.read_line(&mut line).expect("read command line");
    serde_json::from_str(&line).expect("command is JSON")
}

fn reply(writer: &mut UnixStream, command: &Value, data: &Value) {
    let request_id = command.get("request_id").cloned().expect("request id present");
    let line = json!({"request_id": request_id, "error": "success", "data": data});
    writeln!(writer, "{line}").expect("write reply");
}

fn invoke(args: &[&str]) -> (ExitCode, String, String) {
    let argv = std::iter::once("jsonipc")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect::<Vec<_>>();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit = run(argv, &mut stdout, &mut stderr);
    (
        exit,
        String::from_utf8(stdout).expect("stdout is UTF-8"),
        String::from_utf8(stderr).expect("stderr is UTF-8"),
    )
}

#[rstest]
fn send_prints_reply_data(peer: PeerSocket) {
    let server = peer.serve(|mut reader, mut writer| {
        let command = next_command(&mut reader);
        assert_eq!(command.get("command"), Some(&json!(["get_property", "pause"])));
        reply(&mut writer, &command, &json!(false));
    });

    let socket = peer.path();
    let (exit, stdout, stderr) = invoke(&["--socket", &socket, "send", "get_property", "pause"]);

    assert_eq!(exit, ExitCode::SUCCESS, "stderr: {stderr}");
    assert_eq!(stdout, "false\n");
    server.join().expect("peer thread");
}

#[rstest]
fn send_parses_json_arguments(peer: PeerSocket) {
    let server = peer.serve(|mut reader, mut writer| {
        let command = next_command(&mut reader);
        assert_eq!(
            command.get("command"),
            Some(&json!(["set_property", "volume", 50]))
        );
        reply(&mut writer, &command, &Value::Null);
    });

    let socket = peer.path();
    let (exit, stdout, _) = invoke(&["--socket", &socket, "send", "set_property", "volume", "50"]);

    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(stdout, "null\n");
    server.join().expect("peer thread");
}

#[rstest]
fn send_reports_peer_failure(peer: PeerSocket) {
    let server = peer.serve(|mut reader, mut writer| {
        let command = next_command(&mut reader);
        let request_id = command.get("request_id").cloned().expect("request id present");
        let line = json!({"request_id": request_id, "error": "property unavailable"});
        writeln!(writer, "{line}").expect("write reply");
    });

    let socket = peer.path();
    let (exit, stdout, stderr) = invoke(&["--socket", &socket, "send", "get_property", "path"]);

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert!(stderr.contains("property unavailable"), "stderr: {stderr}");
    server.join().expect("peer thread");
}

#[rstest]
fn watch_stops_after_count(peer: PeerSocket) {
    let server = peer.serve(|mut reader, mut writer| {
        writer
            .write_all(b"{\"event\":\"pause\"}\n{\"event\":\"seek\",\"id\":1}\n{\"event\":\"idle\"}\n")
            .expect("write events");
        // Hold the connection until the client hangs up.
        let mut rest = String::new();
        let _ = reader.read_line(&mut rest);
    });

    let socket = peer.path();
    let (exit, stdout, _) = invoke(&["--socket", &socket, "watch", "--count", "2"]);

    assert_eq!(exit, ExitCode::SUCCESS);
    let events = stdout
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).expect("event line is JSON"))
        .collect::<Vec<_>>();
    assert_eq!(events, vec![json!({"event": "pause"}), json!({"event": "seek", "id": 1})]);
    server.join().expect("peer thread");
}

#[rstest]
fn watch_ends_when_peer_hangs_up(peer: PeerSocket) {
    let server = peer.serve(|_reader, mut writer| {
        writer
            .write_all(b"{\"event\":\"shutdown\"}\n")
            .expect("write event");
    });

    let socket = peer.path();
    let (exit, stdout, _) = invoke(&["--socket", &socket, "watch"]);

    assert_eq!(exit, ExitCode::SUCCESS);
    assert_eq!(stdout.lines().count(), 1);
    server.join().expect("peer thread");
}

#[rstest]
fn capabilities_prints_sorted_table(peer: PeerSocket) {
    let server = peer.serve(|mut reader, mut writer| {
        let properties = next_command(&mut reader);
        reply(&mut writer, &properties, &json!(["volume", "pause"]));
        let commands = next_command(&mut reader);
        reply(&mut writer, &commands, &json!([{"name": "quit"}]));
    });

    let socket = peer.path();
    let (exit, stdout, _) = invoke(&["--socket", &socket, "capabilities"]);

    assert_eq!(exit, ExitCode::SUCCESS);
    let table: Value = serde_json::from_str(stdout.trim_end()).expect("table is JSON");
    assert_eq!(table, json!({"properties": ["pause", "volume"], "commands": ["quit"]}));
    server.join().expect("peer thread");
}

#[rstest]
fn missing_socket_fails_with_message(peer: PeerSocket) {
    let socket = peer.path();
    let (exit, stdout, stderr) = invoke(&["--socket", &socket, "send", "stop"]);

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert!(stderr.contains("failed to connect"), "stderr: {stderr}");
}

#[rstest]
#[case(&["--help"])]
#[case(&["--version"])]
fn help_and_version_go_to_stdout(#[case] args: &[&str]) {
    let (exit, stdout, stderr) = invoke(args);

    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(!stdout.is_empty());
    assert!(stderr.is_empty());
}

#[rstest]
fn unknown_subcommand_is_a_usage_error() {
    let (exit, stdout, stderr) = invoke(&["rewind"]);

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(stdout.is_empty());
    assert!(stderr.contains("rewind"), "stderr: {stderr}");
}

#[rstest]
fn watch_with_zero_count_returns_immediately() {
    let (exit, stdout, _) = invoke(&["--socket", "/nonexistent/peer.sock", "watch", "--count", "0"]);

    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(stdout.is_empty());
}
