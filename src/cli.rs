use std::io::{self, Write};
use kvtree::{StoreError, VectorStore};

#[derive(Debug, PartialEq)]
pub enum Command {
    Insert { vec: Vec<f32>, text: Option<String> },
    Search { vec: Vec<f32>, k_top: usize },
    Get { id: String },
    Update { id: String, vec: Vec<f32> },
    List,
    Count,
    Delete { id: String },
    Rebuild,
    Tree,
    Flush,
}

const COMMANDS: &str = "get, insert, search, update, list, count, delete, rebuild, tree, flush";

/// Parse a command from a provided argument vector
/// This is used both for command-line args and REPL input
pub fn parse_command_from_args(args: &[String]) -> Result<Command, String> {
    if args.len() < 2 {
        return Err(format!("No command provided. Use: {}", COMMANDS));
    }

    let command = &args[1];

    match command.as_str() {
        "get" => parse_get(args),
        "insert" => parse_insert(args),
        "search" => parse_search(args),
        "update" => parse_update(args),
        "list" => no_arguments(args, Command::List),
        "count" => no_arguments(args, Command::Count),
        "delete" => parse_delete(args),
        "rebuild" => no_arguments(args, Command::Rebuild),
        "tree" => no_arguments(args, Command::Tree),
        "flush" => no_arguments(args, Command::Flush),
        _ => Err(format!("Unknown command: {}. Available: {}", command, COMMANDS)),
    }
}

fn parse_vector(components: &[String]) -> Result<Vec<f32>, String> {
    let vec: Vec<f32> = components
        .iter()
        .map(|s| s.parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|_| "Failed to parse vector components as numbers".to_string())?;

    if vec.is_empty() {
        return Err("Vector cannot be empty".to_string());
    }
    Ok(vec)
}

/// Parse the 'insert' command
/// Usage: kvtree insert <v1> <v2> ... [--text <words...>]
fn parse_insert(args: &[String]) -> Result<Command, String> {
    // args[0] = program name
    // args[1] = "insert"
    // args[2..] = vector, optionally followed by --text and the payload
    if args.len() < 3 {
        return Err("'insert' command requires a vector. Usage: kvtree insert <v1> <v2> ... [--text <words...>]".to_string());
    }

    let (vector_args, text) = match args[2..].iter().position(|a| a == "--text") {
        Some(pos) => {
            let text = args[2 + pos + 1..].join(" ");
            if text.is_empty() {
                return Err("'--text' requires a payload".to_string());
            }
            (&args[2..2 + pos], Some(text))
        }
        None => (&args[2..], None),
    };

    Ok(Command::Insert { vec: parse_vector(vector_args)?, text })
}

/// Parse the 'search' command
/// Usage: kvtree search <v1> <v2> ... [--k_top <number>]
fn parse_search(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'search' command requires at least one vector component. Usage: kvtree search <v1> <v2> ... [--k_top <number>]".to_string());
    }

    let mut k_top = 5; // default value
    let mut vector_end = args.len();

    // Check if last two args are --k_top and a number
    if args.len() >= 4 && args[args.len() - 2] == "--k_top" {
        match args[args.len() - 1].parse::<usize>() {
            Ok(k) => {
                k_top = k;
                vector_end = args.len() - 2;
            }
            Err(_) => {
                return Err(format!("Invalid --k_top value: '{}'. Must be a non-negative integer.", args[args.len() - 1]));
            }
        }
    }

    Ok(Command::Search { vec: parse_vector(&args[2..vector_end])?, k_top })
}

/// Parse the 'get' command
/// Usage: kvtree get <id>
fn parse_get(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'get' command requires an ID. Usage: kvtree get <id>".to_string());
    }
    Ok(Command::Get { id: args[2].clone() })
}

/// Parse the 'update' command
/// Usage: kvtree update <id> <v1> <v2> ...
fn parse_update(args: &[String]) -> Result<Command, String> {
    if args.len() < 4 {
        return Err("'update' command requires an ID and a vector. Usage: kvtree update <id> <v1> <v2> ...".to_string());
    }
    Ok(Command::Update { id: args[2].clone(), vec: parse_vector(&args[3..])? })
}

/// Parse the 'delete' command
/// Usage: kvtree delete <id>
fn parse_delete(args: &[String]) -> Result<Command, String> {
    if args.len() < 3 {
        return Err("'delete' command requires an ID. Usage: kvtree delete <id>".to_string());
    }
    Ok(Command::Delete { id: args[2].clone() })
}

fn no_arguments(args: &[String], command: Command) -> Result<Command, String> {
    if args.len() > 2 {
        eprintln!("Warning: '{}' command takes no arguments, ignoring extras", args[1]);
    }
    Ok(command)
}

/// REPL mode - interactive session against one store
pub fn run_repl(store: &mut VectorStore) -> io::Result<()> {
    println!("KVTREE - KD-Tree Vector Store");
    println!("Type 'help' for commands, 'exit' or 'quit' to quit\n");

    loop {
        print!("kvtree> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        if input == "exit" || input == "quit" {
            println!("Goodbye!");
            break;
        }

        if input == "help" {
            print_help();
            continue;
        }

        let mut args: Vec<String> = vec!["kvtree".to_string()];
        args.extend(input.split_whitespace().map(|s| s.to_string()));

        let command = match parse_command_from_args(&args) {
            Ok(cmd) => cmd,
            Err(error) => {
                eprintln!("Error: {}", error);
                continue;
            }
        };

        if let Err(error) = execute_command(store, command) {
            eprintln!("Error: {}", error);
        }
    }

    Ok(())
}

/// Single-command mode - run one command against the connected store
/// `args` holds the command and its arguments, without the program name
pub fn run_single_command(store: &mut VectorStore, args: &[String]) -> anyhow::Result<()> {
    let shifted_args: Vec<String> = std::iter::once("kvtree".to_string())
        .chain(args.iter().cloned())
        .collect();

    let command = parse_command_from_args(&shifted_args).map_err(anyhow::Error::msg)?;
    execute_command(store, command)?;
    Ok(())
}

pub fn execute_command(store: &mut VectorStore, command: Command) -> Result<(), StoreError> {
    match command {
        Command::Get { id } => {
            let entry = store.get(&id)?;
            match &entry.text {
                Some(text) => println!("Vector '{}': {:?} text: {:?}", id, entry.values, text),
                None => println!("Vector '{}': {:?}", id, entry.values),
            }
        }

        Command::List => {
            let entries = store.list();
            if entries.is_empty() {
                println!("Store is empty");
            } else {
                println!("Stored vectors:");
                for entry in entries {
                    println!("  {}: {:?}", entry.id, entry.values);
                }
                println!("Total: {} vectors", store.count());
            }
        }

        Command::Count => println!("{}", store.count()),

        Command::Insert { vec, text } => {
            let id = match text {
                Some(text) => store.insert_with_text(vec, text)?,
                None => store.insert(vec)?,
            };
            println!("Inserted with id: {}", id);
        }

        Command::Search { vec, k_top } => {
            let results = store.k_nearest(&vec, k_top)?;
            if results.is_empty() {
                println!("No results found");
            } else {
                println!("Top {} results:", results.len());
                for (rank, hit) in results.iter().enumerate() {
                    println!("{}. ID: {}, Distance: {:.4}, Vector: {:?}",
                        rank + 1, hit.entry.id, hit.distance, hit.entry.values);
                    if let Some(text) = &hit.entry.text {
                        println!("   Text: {}", text);
                    }
                }
            }
        }

        Command::Update { id, vec } => {
            store.update(&id, vec)?;
            println!("Updated vector with id: {}", id);
        }

        Command::Delete { id } => {
            store.delete(&id)?;
            println!("Deleted vector with id: {}", id);
        }

        Command::Rebuild => {
            let before = store.index().depth();
            store.rebuild()?;
            println!("Index rebuilt (depth {} -> {})", before, store.index().depth());
        }

        Command::Tree => print!("{}", store.index().render()),

        Command::Flush => {
            store.flush()?;
            println!("Store flushed");
        }
    }

    Ok(())
}

fn print_help() {
    println!("Available commands:");
    println!("  insert <v1> <v2> ... [--text <words>] - Insert a vector, prints its generated ID");
    println!("  search <v1> <v2> ... [--k_top N]      - Nearest vectors by Euclidean distance (default k=5)");
    println!("  get <id>                              - Retrieve a vector by ID");
    println!("  update <id> <v1> <v2> ...             - Replace the values of a vector");
    println!("  delete <id>                           - Delete a vector");
    println!("  list                                  - List all vectors");
    println!("  count                                 - Show vector count");
    println!("  rebuild                               - Rebalance the index");
    println!("  tree                                  - Print the index structure");
    println!("  flush                                 - Write the store to disk now");
    println!("  help                                  - Show this help");
    println!("  exit, quit                            - Exit the program");
}

#[cfg(test)]
mod cli_test {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        std::iter::once("kvtree")
            .chain(line.split_whitespace())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_insert_plain() {
        assert_eq!(
            parse_command_from_args(&args("insert 1 -2.5 3")).unwrap(),
            Command::Insert { vec: vec![1.0, -2.5, 3.0], text: None }
        );
    }

    #[test]
    fn test_parse_insert_with_text() {
        assert_eq!(
            parse_command_from_args(&args("insert 1 2 --text Cricket is popular")).unwrap(),
            Command::Insert { vec: vec![1.0, 2.0], text: Some("Cricket is popular".to_string()) }
        );
        assert!(parse_command_from_args(&args("insert 1 2 --text")).is_err());
        assert!(parse_command_from_args(&args("insert --text hi")).is_err());
    }

    #[test]
    fn test_parse_search_k_top() {
        assert_eq!(
            parse_command_from_args(&args("search 1 2 --k_top 3")).unwrap(),
            Command::Search { vec: vec![1.0, 2.0], k_top: 3 }
        );
        assert_eq!(
            parse_command_from_args(&args("search 1 2")).unwrap(),
            Command::Search { vec: vec![1.0, 2.0], k_top: 5 }
        );
        assert!(parse_command_from_args(&args("search 1 2 --k_top x")).is_err());
    }

    #[test]
    fn test_parse_update_and_delete() {
        assert_eq!(
            parse_command_from_args(&args("update abc 4 5")).unwrap(),
            Command::Update { id: "abc".to_string(), vec: vec![4.0, 5.0] }
        );
        assert_eq!(
            parse_command_from_args(&args("delete abc")).unwrap(),
            Command::Delete { id: "abc".to_string() }
        );
        assert!(parse_command_from_args(&args("update abc")).is_err());
    }

    #[test]
    fn test_parse_unknown_and_missing() {
        assert!(parse_command_from_args(&args("frobnicate")).is_err());
        assert!(parse_command_from_args(&args("")).is_err());
        assert!(parse_command_from_args(&args("insert 1 two")).is_err());
    }

    #[test]
    fn test_execute_reports_store_errors() {
        let mut store = VectorStore::new();
        execute_command(&mut store, Command::Insert { vec: vec![1.0, 2.0], text: None }).unwrap();

        let result = execute_command(&mut store, Command::Get { id: "missing".to_string() });
        assert!(matches!(result, Err(StoreError::NotFound(_))));

        let result = execute_command(&mut store, Command::Search { vec: vec![1.0], k_top: 1 });
        assert!(matches!(result, Err(StoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_execute_rejects_nan_components() {
        let mut store = VectorStore::new();
        let cmd = parse_command_from_args(&args("insert 0 nan")).unwrap();
        let result = execute_command(&mut store, cmd);
        assert!(matches!(result, Err(StoreError::NonFiniteValue { index: 1 })));
        assert_eq!(store.count(), 0);

        let cmd = parse_command_from_args(&args("search inf 0")).unwrap();
        let result = execute_command(&mut store, cmd);
        assert!(matches!(result, Err(StoreError::NonFiniteValue { index: 0 })));
    }

    #[test]
    fn test_run_single_command_insert_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.db");
        let mut store = VectorStore::connect(&path).unwrap();

        run_single_command(&mut store, &["insert".to_string(), "1".to_string(), "2".to_string()]).unwrap();
        assert_eq!(VectorStore::connect(&path).unwrap().count(), 1);

        assert!(run_single_command(&mut store, &["bogus".to_string()]).is_err());
    }
}
