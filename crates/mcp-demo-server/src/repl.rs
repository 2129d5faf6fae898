//! Interactive console for the mcp-demo server.
//!
//! Launch with `mcp-demo-server repl`. Every command is sent as a JSON-RPC
//! request to an in-process session, so the console sees exactly what a
//! remote client would. Type `/help` for available commands, Tab for completion.

use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{
    Cmd, ConditionalEventHandler, Config, Editor, Event, EventContext, EventHandler, Helper,
    KeyEvent, RepeatCount,
};
use serde_json::{json, Value};
use tokio::runtime::Handle;

use mcp_demo::CapabilityKind;

use crate::protocol::ProtocolHandler;
use crate::types::{JsonRpcRequest, RequestId, ServerDescriptor};

/// Available REPL commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/tools", "List registered tools"),
    ("/resources", "List registered resources"),
    ("/prompts", "List registered prompts"),
    ("/call", "Call a tool: /call <name> [json arguments]"),
    ("/read", "Read a resource: /read <uri>"),
    ("/get", "Expand a prompt: /get <name> [json arguments]"),
    ("/info", "Show the server descriptor"),
    ("/clear", "Clear the screen"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the REPL"),
];

/// REPL helper for tab completion of commands and capability names.
struct ConsoleHelper {
    tools: Vec<String>,
    resources: Vec<String>,
    prompts: Vec<String>,
}

impl ConsoleHelper {
    fn new(handler: &ProtocolHandler) -> Self {
        let registry = handler.registry();
        let names = |kind: CapabilityKind| -> Vec<String> {
            registry
                .list_all(kind)
                .into_iter()
                .map(|(name, _)| name.to_string())
                .collect()
        };
        Self {
            tools: names(CapabilityKind::Tool),
            resources: registry
                .entries(CapabilityKind::Resource)
                .filter_map(|e| e.locator().map(|l| l.uri.clone()))
                .collect(),
            prompts: names(CapabilityKind::Prompt),
        }
    }

    fn candidates(&self, cmd: &str) -> &[String] {
        match cmd {
            "/call" => &self.tools,
            "/read" => &self.resources,
            "/get" => &self.prompts,
            _ => &[],
        }
    }
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];

        if !input.contains(' ') {
            let matches: Vec<Pair> = COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(input))
                .map(|(cmd, desc)| Pair {
                    display: format!("{cmd:<16} {desc}"),
                    replacement: format!("{cmd} "),
                })
                .collect();
            return Ok((0, matches));
        }

        let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
        if args.contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let prefix_start = input.len() - args.len();
        let matches: Vec<Pair> = self
            .candidates(cmd)
            .iter()
            .filter(|name| name.starts_with(args))
            .map(|name| Pair {
                display: name.clone(),
                replacement: format!("{name} "),
            })
            .collect();
        Ok((prefix_start, matches))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        if line.starts_with('/') && !line.contains(' ') {
            for (cmd, _) in COMMANDS {
                if cmd.starts_with(line) && *cmd != line {
                    return Some(cmd[line.len()..].to_string());
                }
            }
        }
        None
    }
}

impl Highlighter for ConsoleHelper {}
impl Validator for ConsoleHelper {}
impl Helper for ConsoleHelper {}

struct TabCompleteOrAcceptHint;

impl ConditionalEventHandler for TabCompleteOrAcceptHint {
    fn handle(
        &self,
        _evt: &Event,
        _n: RepeatCount,
        _positive: bool,
        ctx: &EventContext<'_>,
    ) -> Option<Cmd> {
        if ctx.has_hint() {
            Some(Cmd::CompleteHint)
        } else {
            Some(Cmd::Complete)
        }
    }
}

/// A console session bound to one dispatcher.
struct Console {
    handler: ProtocolHandler,
    descriptor: ServerDescriptor,
    runtime: Handle,
    next_id: i64,
}

impl Console {
    fn request(&mut self, method: &str, params: Option<Value>) -> Value {
        self.next_id += 1;
        let request = JsonRpcRequest::new(RequestId::from(self.next_id), method, params);
        self.runtime.block_on(self.handler.handle_request(request))
    }

    /// Print the `result` of a response, or its error.
    fn show(&mut self, method: &str, params: Option<Value>) -> Option<Value> {
        let response = self.request(method, params);
        if let Some(error) = response.get("error") {
            eprintln!(
                "  \x1b[31merror {}\x1b[0m {}",
                error["code"],
                error["message"].as_str().unwrap_or("")
            );
            if let Some(data) = error.get("data") {
                eprintln!("    {data}");
            }
            return None;
        }
        response.get("result").cloned()
    }

    fn list(&mut self, kind: CapabilityKind) {
        let method = format!("{}/list", kind.plural());
        let Some(result) = self.show(&method, None) else {
            return;
        };
        let items = result[kind.plural()].as_array().cloned().unwrap_or_default();

        eprintln!();
        eprintln!("  {} {} available:", items.len(), kind.plural());
        eprintln!();
        for item in &items {
            let label = match kind {
                CapabilityKind::Resource => item["uri"].as_str().unwrap_or(""),
                _ => item["name"].as_str().unwrap_or(""),
            };
            eprintln!(
                "    {label:<40} {}",
                item["description"].as_str().unwrap_or("")
            );
        }
        eprintln!();
    }

    fn call(&mut self, method: &str, args: &str) {
        let (name, raw) = args.split_once(' ').unwrap_or((args, ""));
        if name.is_empty() {
            eprintln!("  Usage: /{} <name> [json arguments]", method_command(method));
            return;
        }

        let arguments = match parse_arguments(raw) {
            Ok(arguments) => arguments,
            Err(e) => {
                eprintln!("  Arguments must be a JSON object: {e}");
                return;
            }
        };

        let params = json!({ "name": name, "arguments": arguments });
        if let Some(result) = self.show(method, Some(params)) {
            print_result(&result);
        }
    }

    fn read(&mut self, uri: &str) {
        if uri.is_empty() {
            eprintln!("  Usage: /read <uri>");
            return;
        }
        if let Some(result) = self.show("resources/read", Some(json!({ "uri": uri }))) {
            print_result(&result);
        }
    }
}

fn method_command(method: &str) -> &'static str {
    match method {
        "tools/call" => "call",
        _ => "get",
    }
}

fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw)
}

/// Print text blocks plainly and anything else as pretty JSON.
fn print_result(result: &Value) {
    eprintln!();
    let blocks = result
        .get("content")
        .or_else(|| result.get("contents"))
        .and_then(Value::as_array);
    let messages = result.get("messages").and_then(Value::as_array);

    match (blocks, messages) {
        (Some(blocks), _) => {
            for block in blocks {
                match block["text"].as_str() {
                    Some(text) => eprintln!("  {text}"),
                    None => eprintln!("  {block}"),
                }
            }
        }
        (None, Some(messages)) => {
            for message in messages {
                eprintln!(
                    "  [{}] {}",
                    message["role"].as_str().unwrap_or("?"),
                    message["content"]["text"].as_str().unwrap_or("")
                );
            }
        }
        (None, None) => {
            eprintln!(
                "  {}",
                serde_json::to_string_pretty(result).unwrap_or_default()
            );
        }
    }
    eprintln!();
}

/// Run the interactive REPL. Blocks the calling thread; `runtime` drives
/// the dispatcher.
pub fn run(handler: ProtocolHandler, descriptor: ServerDescriptor, runtime: Handle) -> anyhow::Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[32m\u{25c9}\x1b[0m \x1b[1m{} v{}\x1b[0m \x1b[90mMCP demo console\x1b[0m",
        descriptor.name, descriptor.version
    );
    eprintln!();
    eprintln!(
        "    Press \x1b[36m/\x1b[0m to browse commands, \x1b[90mTab\x1b[0m to complete, \x1b[90m/exit\x1b[0m to quit."
    );
    eprintln!();

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(20)
        .build();

    let mut rl: Editor<ConsoleHelper, rustyline::history::DefaultHistory> =
        Editor::with_config(config)?;
    rl.set_helper(Some(ConsoleHelper::new(&handler)));
    rl.bind_sequence(
        KeyEvent::from('\t'),
        EventHandler::Conditional(Box::new(TabCompleteOrAcceptHint)),
    );

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    let hist_path = std::path::PathBuf::from(&home).join(".mcp_demo_history");
    if hist_path.exists() {
        let _ = rl.load_history(&hist_path);
    }

    let mut console = Console {
        handler,
        descriptor,
        runtime,
        next_id: 0,
    };
    let prompt = " \x1b[36mmcp>\x1b[0m ";

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let input = line.strip_prefix('/').unwrap_or(line);
                if input.is_empty() {
                    cmd_help();
                    continue;
                }

                let (cmd, args) = input.split_once(' ').unwrap_or((input, ""));
                let args = args.trim();

                match cmd {
                    "exit" | "quit" => {
                        eprintln!("  Goodbye!");
                        break;
                    }
                    "help" | "h" | "?" => cmd_help(),
                    "clear" | "cls" => eprint!("\x1b[2J\x1b[H"),
                    "info" => eprintln!("\n{}\n", console.descriptor.to_pretty_json()),
                    "tools" => console.list(CapabilityKind::Tool),
                    "resources" => console.list(CapabilityKind::Resource),
                    "prompts" => console.list(CapabilityKind::Prompt),
                    "call" => console.call("tools/call", args),
                    "get" => console.call("prompts/get", args),
                    "read" => console.read(args),
                    _ => {
                        eprintln!("  Unknown command '/{cmd}'. Type /help for commands.");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                eprintln!("  \x1b[90m(Ctrl+C)\x1b[0m Type \x1b[1m/exit\x1b[0m to quit.");
            }
            Err(ReadlineError::Eof) => {
                eprintln!("  Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("  Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(&hist_path);

    Ok(())
}

fn cmd_help() {
    eprintln!();
    eprintln!("  Commands:");
    eprintln!();
    for (cmd, desc) in COMMANDS {
        eprintln!("    {cmd:<18} {desc}");
    }
    eprintln!();
    eprintln!("  Tip: Tab completes commands and capability names.");
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Implementation;
    use crate::McpServer;

    fn helper() -> ConsoleHelper {
        let server = McpServer::demo("http://127.0.0.1:3001", Implementation::default()).unwrap();
        ConsoleHelper::new(&server.session())
    }

    #[test]
    fn test_helper_collects_names() {
        let helper = helper();
        assert_eq!(helper.tools, vec!["mcpDemo_getTime"]);
        assert_eq!(
            helper.resources,
            vec!["http://127.0.0.1:3001/server-info.json"]
        );
        assert_eq!(helper.candidates("/get"), ["time-query".to_string()]);
    }

    #[test]
    fn test_arguments_default_to_empty_object() {
        assert_eq!(parse_arguments("  ").unwrap(), json!({}));
        assert_eq!(
            parse_arguments(r#"{"format":"iso"}"#).unwrap(),
            json!({"format": "iso"})
        );
        assert!(parse_arguments("{oops").is_err());
    }
}
