//! Command registry.
//!
//! A [`CommandRegistry`] maps command names to handlers. Registration
//! overwrites any earlier entry with the same name; there is no removal.
//!
//! A process-wide registry is available through [`CommandRegistry::global`]
//! and [`register_command`], mirroring init-time registration. Dispatchers
//! take an explicit `Arc<CommandRegistry>` so tests and embedders can use
//! their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use tracing::debug;

/// Handler signature: positional arguments in, serialised reply bytes out.
pub type CommandHandler = Arc<dyn Fn(&[String]) -> Vec<u8> + Send + Sync>;

static GLOBAL: LazyLock<Arc<CommandRegistry>> =
    LazyLock::new(|| Arc::new(CommandRegistry::new()));

// =============================================================================
// Command
// =============================================================================

/// A registered command.
#[derive(Clone)]
pub struct Command {
    name: String,
    handler: CommandHandler,
    expected_args: usize,
    require_mention: bool,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact number of positional arguments the handler accepts.
    pub fn expected_args(&self) -> usize {
        self.expected_args
    }

    /// Whether the robot must be @-mentioned for the command to run.
    pub fn require_mention(&self) -> bool {
        self.require_mention
    }

    /// Runs the handler.
    pub fn invoke(&self, args: &[String]) -> Vec<u8> {
        (self.handler)(args)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("expected_args", &self.expected_args)
            .field("require_mention", &self.require_mention)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// CommandRegistry
// =============================================================================

/// Thread-safe name → [`Command`] table.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<CommandRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Registers `handler` under `name`, replacing any previous entry.
    pub fn register<F>(
        &self,
        name: impl Into<String>,
        handler: F,
        expected_args: usize,
        require_mention: bool,
    ) where
        F: Fn(&[String]) -> Vec<u8> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(command = %name, expected_args, require_mention, "Registering command");
        let command = Command {
            name: name.clone(),
            handler: Arc::new(handler),
            expected_args,
            require_mention,
        };
        self.commands.write().insert(name, command);
    }

    /// Looks up a command by name.
    pub fn get(&self, name: &str) -> Option<Command> {
        self.commands.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.read().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.read().is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.names())
            .finish()
    }
}

/// Registers a command in the process-wide registry.
pub fn register_command<F>(
    name: impl Into<String>,
    handler: F,
    expected_args: usize,
    require_mention: bool,
) where
    F: Fn(&[String]) -> Vec<u8> + Send + Sync + 'static,
{
    GLOBAL.register(name, handler, expected_args, require_mention);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_invoke() {
        let registry = CommandRegistry::new();
        registry.register("echo", |args| args.join(" ").into_bytes(), 2, false);

        let cmd = registry.get("echo").unwrap();
        assert_eq!(cmd.name(), "echo");
        assert_eq!(cmd.expected_args(), 2);
        assert!(!cmd.require_mention());
        assert_eq!(cmd.invoke(&["a".into(), "b".into()]), b"a b");
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = CommandRegistry::new();
        registry.register("ping", |_| b"one".to_vec(), 0, false);
        registry.register("ping", |_| b"two".to_vec(), 0, true);

        assert_eq!(registry.len(), 1);
        let cmd = registry.get("ping").unwrap();
        assert!(cmd.require_mention());
        assert_eq!(cmd.invoke(&[]), b"two");
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("missing").is_none());
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_names_sorted() {
        let registry = CommandRegistry::new();
        registry.register("status", |_| Vec::new(), 0, false);
        registry.register("deploy", |_| Vec::new(), 1, true);
        assert_eq!(registry.names(), vec!["deploy", "status"]);
    }

    #[test]
    fn test_global_registry_is_shared() {
        register_command("registry-test-global", |_| b"ok".to_vec(), 0, false);
        assert!(CommandRegistry::global().contains("registry-test-global"));
        assert!(Arc::ptr_eq(
            &CommandRegistry::global(),
            &CommandRegistry::global()
        ));
    }

    #[test]
    fn test_concurrent_lookup() {
        let registry = Arc::new(CommandRegistry::new());
        registry.register("hello", |_| b"hi".to_vec(), 0, false);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.get("hello").unwrap().invoke(&[]))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), b"hi");
        }
    }
}
