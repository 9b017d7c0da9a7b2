//! In-memory [`ExecutionChannel`] for tests.
//!
//! Holds a flat map of absolute paths to [`Node`]s and interprets every
//! [`RemoteOp`] against it with the same observable results the shell
//! scripts produce. Every mutating call is appended to a log so tests can
//! assert that a pass changed nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use rostersync_core::types::ContainerPath;

use crate::channel::{CommandOutput, ExecutionChannel, RemoteOp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(String),
    Dir,
    Link(String),
}

/// A filesystem change made through the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    MakeDirs(Vec<String>),
    Write(String),
    RemoveAll(String),
    Symlink { target: String, link: String },
}

impl Mutation {
    /// Whether the mutation touched `path` or anything beneath it.
    pub fn touches(&self, path: &str) -> bool {
        let hit = |p: &str| p == path || p.starts_with(&format!("{path}/"));
        match self {
            Mutation::MakeDirs(paths) => paths.iter().any(|p| hit(p)),
            Mutation::Write(p) | Mutation::RemoveAll(p) => hit(p),
            Mutation::Symlink { link, .. } => hit(link),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    mutations: Vec<Mutation>,
    failing_writes: BTreeSet<String>,
}

#[derive(Debug)]
pub struct MemoryChannel {
    state: Mutex<State>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn key(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent_of(path: &str) -> Option<String> {
    ContainerPath::from(path).parent().map(|p| p.0)
}

fn is_under(candidate: &str, dir: &str) -> bool {
    if dir == "/" {
        return candidate != "/";
    }
    candidate.starts_with(&format!("{dir}/"))
}

impl State {
    fn follow<'a>(&'a self, path: &str) -> Option<&'a Node> {
        match self.nodes.get(path)? {
            Node::Link(target) => self.nodes.get(&key(target)),
            node => Some(node),
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        matches!(self.follow(path), Some(Node::Dir))
    }

    fn make_dir_all(&mut self, path: &str) -> Result<(), String> {
        let mut chain = vec![path.to_string()];
        let mut cursor = path.to_string();
        while let Some(parent) = parent_of(&cursor) {
            chain.push(parent.clone());
            cursor = parent;
        }
        for dir in chain.into_iter().rev() {
            match self.nodes.get(&dir) {
                None => {
                    self.nodes.insert(dir, Node::Dir);
                }
                Some(Node::Dir) => {}
                Some(_) if self.is_dir(&dir) => {}
                Some(_) => return Err(format!("mkdir: cannot create directory '{dir}': File exists")),
            }
        }
        Ok(())
    }

    fn children(&self, dir: &str) -> Vec<String> {
        let prefix = if dir == "/" { "/".to_string() } else { format!("{dir}/") };
        self.nodes
            .keys()
            .filter(|k| k.starts_with(&prefix) && !k[prefix.len()..].contains('/') && k.len() > prefix.len())
            .map(|k| k[prefix.len()..].to_string())
            .collect()
    }

    fn apply(&mut self, op: &RemoteOp) -> CommandOutput {
        match op {
            RemoteOp::FileExists { path } => {
                let found = matches!(self.follow(&key(path.as_str())), Some(Node::File(_)));
                CommandOutput::ok(if found { "yes\n" } else { "no\n" })
            }
            RemoteOp::MakeDirs { paths } => {
                let keys: Vec<String> = paths.iter().map(|p| key(p.as_str())).collect();
                self.mutations.push(Mutation::MakeDirs(keys.clone()));
                for dir in &keys {
                    if let Err(e) = self.make_dir_all(dir) {
                        return CommandOutput::failed(1, e);
                    }
                }
                CommandOutput::ok("")
            }
            RemoteOp::ReadFile { path } => match self.follow(&key(path.as_str())) {
                Some(Node::File(content)) => CommandOutput::ok(content.clone()),
                Some(_) => CommandOutput::failed(1, format!("cat: {path}: Is a directory")),
                None => CommandOutput::failed(1, format!("cat: {path}: No such file or directory")),
            },
            RemoteOp::ResolveLink { path } => match self.nodes.get(&key(path.as_str())) {
                Some(Node::Link(target)) => CommandOutput::ok(format!("{}\n", key(target))),
                _ => CommandOutput::ok(""),
            },
            RemoteOp::ListRealDir { path } => {
                let k = key(path.as_str());
                match self.nodes.get(&k) {
                    Some(Node::Dir) => {
                        let mut listing = self.children(&k).join("\n");
                        if !listing.is_empty() {
                            listing.push('\n');
                        }
                        CommandOutput::ok(listing)
                    }
                    _ => CommandOutput::ok(""),
                }
            }
            RemoteOp::RemoveAll { path } => {
                let k = key(path.as_str());
                self.mutations.push(Mutation::RemoveAll(k.clone()));
                self.nodes.retain(|p, _| *p != k && !is_under(p, &k));
                CommandOutput::ok("")
            }
            RemoteOp::Symlink { target, link } => {
                let link = key(link.as_str());
                let target = key(target.as_str());
                self.mutations.push(Mutation::Symlink {
                    target: target.clone(),
                    link: link.clone(),
                });
                if self.nodes.contains_key(&link) {
                    return CommandOutput::failed(
                        1,
                        format!("ln: failed to create symbolic link '{link}': File exists"),
                    );
                }
                match parent_of(&link) {
                    Some(parent) if self.is_dir(&parent) => {
                        self.nodes.insert(link, Node::Link(target));
                        CommandOutput::ok("")
                    }
                    _ => CommandOutput::failed(
                        1,
                        format!("ln: failed to create symbolic link '{link}': No such file or directory"),
                    ),
                }
            }
        }
    }
}

impl MemoryChannel {
    /// An empty tree containing only `/`.
    pub fn new() -> Self {
        let mut state = State::default();
        state.nodes.insert("/".to_string(), Node::Dir);
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- seeding (not logged) -------------------------------------------

    pub fn with_dir(self, path: &str) -> Self {
        self.insert_dir(path);
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.insert_file(path, content);
        self
    }

    pub fn with_json(self, path: &str, doc: &Value) -> Self {
        let mut text = serde_json::to_string_pretty(doc).unwrap_or_default();
        text.push('\n');
        self.with_file(path, &text)
    }

    pub fn insert_dir(&self, path: &str) {
        let mut state = self.lock();
        let _ = state.make_dir_all(&key(path));
    }

    /// Seed a file, creating its parent directories.
    pub fn insert_file(&self, path: &str, content: &str) {
        let k = key(path);
        let mut state = self.lock();
        if let Some(parent) = parent_of(&k) {
            let _ = state.make_dir_all(&parent);
        }
        state.nodes.insert(k, Node::File(content.to_string()));
    }

    pub fn insert_link(&self, link: &str, target: &str) {
        let k = key(link);
        let mut state = self.lock();
        if let Some(parent) = parent_of(&k) {
            let _ = state.make_dir_all(&parent);
        }
        state.nodes.insert(k, Node::Link(key(target)));
    }

    /// Delete `path` and everything beneath it.
    pub fn remove(&self, path: &str) {
        let k = key(path);
        self.lock().nodes.retain(|p, _| *p != k && !is_under(p, &k));
    }

    /// Make every later `write_file` to `path` fail.
    pub fn fail_writes_to(&self, path: &str) {
        self.lock().failing_writes.insert(key(path));
    }

    pub fn allow_writes_to(&self, path: &str) {
        self.lock().failing_writes.remove(&key(path));
    }

    // -- inspection -----------------------------------------------------

    pub fn node(&self, path: &str) -> Option<Node> {
        self.lock().nodes.get(&key(path)).cloned()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        match self.node(path)? {
            Node::File(content) => Some(content),
            _ => None,
        }
    }

    pub fn json(&self, path: &str) -> Option<Value> {
        serde_json::from_str(&self.file(path)?).ok()
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(&key(path))
    }

    /// Every mutation since construction or the last [`Self::clear_mutations`].
    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.lock().mutations.clear();
    }
}

impl ExecutionChannel for MemoryChannel {
    fn run(&self, op: &RemoteOp) -> CommandOutput {
        self.lock().apply(op)
    }

    fn write_file(&self, path: &ContainerPath, content: &str) -> bool {
        let k = key(path.as_str());
        let mut state = self.lock();
        state.mutations.push(Mutation::Write(k.clone()));
        if state.failing_writes.contains(&k) {
            return false;
        }
        let parent_ok = parent_of(&k).map(|p| state.is_dir(&p)).unwrap_or(false);
        if !parent_ok || state.is_dir(&k) {
            return false;
        }
        state.nodes.insert(k, Node::File(content.to_string()));
        true
    }
}
