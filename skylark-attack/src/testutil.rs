//! Scripted tool runner for driving the attack flows in tests

use async_trait::async_trait;
use parking_lot::Mutex;
use skylark_core::Result;
use skylark_session::{CommandOutput, ToolRunner};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

type SpawnHook = Box<dyn Fn(&[String]) + Send + Sync>;

struct Rule {
    program: String,
    contains: Option<String>,
    queue: Vec<CommandOutput>,
}

/// Fake `ToolRunner` scripted per command.
///
/// Foreground runs match rules by program name plus an optional substring of
/// the joined arguments; queued outputs replay in order with the last one
/// repeating. Unmatched commands succeed with empty output. Spawns register
/// a live id and fire any hook installed for that program, which lets a test
/// materialize the files the real tool would have written.
pub(crate) struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
    spawns: Mutex<Vec<String>>,
    live: Mutex<HashSet<Uuid>>,
    dead_tools: Mutex<HashSet<String>>,
    spawn_hooks: Mutex<Vec<(String, SpawnHook)>>,
    terminated: AtomicUsize,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            spawns: Mutex::new(Vec::new()),
            live: Mutex::new(HashSet::new()),
            dead_tools: Mutex::new(HashSet::new()),
            spawn_hooks: Mutex::new(Vec::new()),
            terminated: AtomicUsize::new(0),
        }
    }

    pub fn output(code: i32, stdout: &str) -> CommandOutput {
        CommandOutput {
            code,
            stdout: stdout.to_string(),
            stderr: String::new(),
            timed_out: false,
        }
    }

    /// Script outputs for `program` invocations whose args contain
    /// `contains` (all invocations when `None`).
    pub fn script(&self, program: &str, contains: Option<&str>, queue: Vec<CommandOutput>) {
        self.rules.lock().push(Rule {
            program: program.to_string(),
            contains: contains.map(str::to_string),
            queue,
        });
    }

    /// Run a closure on every spawn of `program`, receiving its args
    pub fn on_spawn<F>(&self, program: &str, hook: F)
    where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.spawn_hooks
            .lock()
            .push((program.to_string(), Box::new(hook)));
    }

    /// Mark a tool as one whose spawned process dies immediately
    pub fn kill_on_spawn(&self, program: &str) {
        self.dead_tools.lock().insert(program.to_string());
    }

    pub fn run_count(&self, program: &str, contains: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(program) && c.contains(contains))
            .count()
    }

    pub fn spawn_count(&self, program: &str) -> usize {
        self.spawns
            .lock()
            .iter()
            .filter(|c| c.starts_with(program))
            .count()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn terminated_count(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[&str],
        _limit: Option<Duration>,
    ) -> Result<CommandOutput> {
        let joined = args.join(" ");
        self.calls.lock().push(format!("{program} {joined}"));

        let mut rules = self.rules.lock();
        for rule in rules.iter_mut() {
            if rule.program != program {
                continue;
            }
            if let Some(needle) = &rule.contains {
                if !joined.contains(needle.as_str()) {
                    continue;
                }
            }
            if rule.queue.len() > 1 {
                return Ok(rule.queue.remove(0));
            }
            if let Some(last) = rule.queue.first() {
                return Ok(last.clone());
            }
        }
        Ok(Self::output(0, ""))
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<Uuid> {
        let owned: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.spawns
            .lock()
            .push(format!("{program} {}", owned.join(" ")));

        for (hooked, hook) in self.spawn_hooks.lock().iter() {
            if hooked == program {
                hook(&owned);
            }
        }

        let id = Uuid::now_v7();
        if !self.dead_tools.lock().contains(program) {
            self.live.lock().insert(id);
        }
        Ok(id)
    }

    async fn is_alive(&self, id: Uuid) -> bool {
        self.live.lock().contains(&id)
    }

    async fn terminate(&self, id: Uuid) -> bool {
        let removed = self.live.lock().remove(&id);
        if removed {
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    async fn terminate_all(&self) -> usize {
        let mut live = self.live.lock();
        let stopped = live.len();
        live.clear();
        self.terminated.fetch_add(stopped, Ordering::SeqCst);
        stopped
    }
}
