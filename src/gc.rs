//! Mark-sweep heap backing every Lox value and environment.
//!
//! Values and environments never live behind `Rc<RefCell<_>>`; they live in
//! two growable arenas owned by [`Heap`], addressed by the opaque handles
//! [`ValueRef`]/[`EnvRef`]. A handle is `Copy` and carries no lifetime, so
//! the evaluator can pass values around freely without borrow-checker
//! friction; reachability, not Rust ownership, decides when a slot is
//! reclaimed.
//!
//! Collection is mark-sweep. Roots are every environment currently marked
//! `active` (a scope that hasn't exited yet) plus everything pinned on the
//! lock stack (temporaries mid-evaluation that would otherwise dangle while
//! a sibling sub-expression runs). A collection doubles the live count (or
//! matches the current arena size, whichever is larger) to pick the next
//! threshold, mirroring a classic generational-free mark-sweep tuning rule.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::class::{ClassObj, InstanceObj};
use crate::error::RuntimeError;
use crate::function::{FunctionObj, NativeFunction};
use crate::limits::{
    GC_CLEAR, GC_MARK_WRAP, GLOBAL_TABLE_MAX_LOAD, GLOBAL_TABLE_MIN_CAPACITY, LOCK_CAP,
    MAX_ENVIRONMENTS,
};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueRef(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvRef(u32);

/// The payload a [`ValueRef`] resolves to.
#[derive(Debug, Clone)]
pub enum RawValue {
    /// A `var` declared without an initializer. Behaves exactly like `Nil`
    /// unless the `uninit-var-error` feature is enabled, in which case
    /// reading one before it's assigned is a runtime error.
    Uninit,
    Nil,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Native(NativeFunction),
    Function(FunctionObj),
    Class(ClassObj),
    Instance(InstanceObj),
}

impl RawValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RawValue::Uninit | RawValue::Nil => "nil",
            RawValue::Bool(_) => "boolean",
            RawValue::Number(_) => "number",
            RawValue::Str(_) => "string",
            RawValue::Native(_) | RawValue::Function(_) => "function",
            RawValue::Class(_) => "class",
            RawValue::Instance(_) => "instance",
        }
    }
}

struct ValueSlot {
    value: RawValue,
    mark: i64,
    free: bool,
}

/// A local environment's bindings: one slot per declaration, in the order
/// the resolver assigned them. Global scope uses [`GlobalTable`] instead.
pub enum EnvKind {
    Global(GlobalTable),
    Local(Vec<ValueRef>),
}

pub struct EnvRecord {
    pub enclosing: Option<EnvRef>,
    pub kind: EnvKind,
    pub active: bool,
    mark: i64,
}

enum EnvSlot {
    Free,
    Used(EnvRecord),
}

/// Open-addressed hash table backing the global scope. Capacity is always a
/// power of two and doubles once the load factor would cross 0.75.
pub struct GlobalTable {
    entries: Vec<Option<(Rc<str>, ValueRef)>>,
    len: usize,
}

impl GlobalTable {
    pub fn new() -> Self {
        GlobalTable { entries: vec![None; GLOBAL_TABLE_MIN_CAPACITY], len: 0 }
    }

    fn hash_of(name: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }

    fn slot_for(&self, name: &str) -> usize {
        let mask = self.entries.len() - 1;
        let mut i = (Self::hash_of(name) as usize) & mask;
        loop {
            match &self.entries[i] {
                None => return i,
                Some((n, _)) if n.as_ref() == name => return i,
                _ => i = (i + 1) & mask,
            }
        }
    }

    fn grow(&mut self) {
        let new_len = self.entries.len() * 2;
        let old = std::mem::replace(&mut self.entries, vec![None; new_len]);
        self.len = 0;
        for entry in old.into_iter().flatten() {
            let i = self.slot_for(&entry.0);
            self.entries[i] = Some(entry);
            self.len += 1;
        }
    }

    pub fn define(&mut self, name: &str, value: ValueRef) {
        if (self.len + 1) as f64 > GLOBAL_TABLE_MAX_LOAD * self.entries.len() as f64 {
            self.grow();
        }
        let i = self.slot_for(name);
        if self.entries[i].is_none() {
            self.len += 1;
        }
        self.entries[i] = Some((Rc::from(name), value));
    }

    pub fn get(&self, name: &str) -> Option<ValueRef> {
        self.entries[self.slot_for(name)].as_ref().map(|(_, v)| *v)
    }

    /// Returns `false` when `name` has never been defined.
    pub fn assign(&mut self, name: &str, value: ValueRef) -> bool {
        let i = self.slot_for(name);
        match &mut self.entries[i] {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, ValueRef)> {
        self.entries.iter().filter_map(|e| e.as_ref().map(|(n, v)| (n, *v)))
    }
}

impl Default for GlobalTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Heap {
    values: Vec<ValueSlot>,
    value_free: Vec<u32>,
    value_threshold: usize,

    envs: Vec<EnvSlot>,
    env_free: Vec<u32>,
    env_threshold: usize,

    lock_stack: Vec<ValueRef>,

    visited: i64,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            values: Vec::new(),
            value_free: Vec::new(),
            value_threshold: 256,
            envs: Vec::new(),
            env_free: Vec::new(),
            env_threshold: 64,
            lock_stack: Vec::new(),
            visited: 0,
        }
    }

    // -- values --------------------------------------------------------

    pub fn alloc_value(&mut self, value: RawValue) -> ValueRef {
        if self.value_free.is_empty() && self.values.len() >= self.value_threshold {
            self.collect();
        }
        if let Some(i) = self.value_free.pop() {
            self.values[i as usize] = ValueSlot { value, mark: GC_CLEAR, free: false };
            ValueRef(i)
        } else {
            self.values.push(ValueSlot { value, mark: GC_CLEAR, free: false });
            ValueRef((self.values.len() - 1) as u32)
        }
    }

    pub fn get(&self, r: ValueRef) -> &RawValue {
        &self.values[r.0 as usize].value
    }

    pub fn get_mut(&mut self, r: ValueRef) -> &mut RawValue {
        &mut self.values[r.0 as usize].value
    }

    // -- lock stack ------------------------------------------------------
    // Every temporary whose lifetime straddles another allocating call must
    // be pinned here first; otherwise a collection mid-evaluation could
    // reclaim it.

    pub fn lock(&mut self, r: ValueRef, at: &Token) -> Result<(), RuntimeError> {
        if self.lock_stack.len() >= LOCK_CAP {
            return Err(RuntimeError::fatal(at.clone(), "Stack overflow."));
        }
        self.lock_stack.push(r);
        Ok(())
    }

    pub fn unlock(&mut self) {
        self.lock_stack.pop();
    }

    pub fn unlock_n(&mut self, n: usize) {
        let new_len = self.lock_stack.len().saturating_sub(n);
        self.lock_stack.truncate(new_len);
    }

    // -- environments ----------------------------------------------------

    pub fn alloc_env(&mut self, enclosing: Option<EnvRef>, kind: EnvKind, at: &Token) -> Result<EnvRef, RuntimeError> {
        let active_envs = self.envs.len() - self.env_free.len();
        if self.env_free.is_empty() && active_envs >= self.env_threshold {
            self.collect();
        }
        if self.env_free.is_empty() && self.envs.len() >= MAX_ENVIRONMENTS {
            return Err(RuntimeError::fatal(at.clone(), "Stack overflow."));
        }
        let record = EnvRecord { enclosing, kind, active: true, mark: GC_CLEAR };
        if let Some(i) = self.env_free.pop() {
            self.envs[i as usize] = EnvSlot::Used(record);
            Ok(EnvRef(i))
        } else {
            self.envs.push(EnvSlot::Used(record));
            Ok(EnvRef((self.envs.len() - 1) as u32))
        }
    }

    pub fn deactivate_env(&mut self, env: EnvRef) {
        if let EnvSlot::Used(rec) = &mut self.envs[env.0 as usize] {
            rec.active = false;
        }
    }

    fn record(&self, env: EnvRef) -> &EnvRecord {
        match &self.envs[env.0 as usize] {
            EnvSlot::Used(rec) => rec,
            EnvSlot::Free => panic!("stale environment handle"),
        }
    }

    fn record_mut(&mut self, env: EnvRef) -> &mut EnvRecord {
        match &mut self.envs[env.0 as usize] {
            EnvSlot::Used(rec) => rec,
            EnvSlot::Free => panic!("stale environment handle"),
        }
    }

    pub fn enclosing(&self, env: EnvRef) -> Option<EnvRef> {
        self.record(env).enclosing
    }

    /// One-line description of an environment's bindings, for the `env()`
    /// native diagnostic.
    pub fn env_summary(&self, env: EnvRef) -> String {
        match &self.record(env).kind {
            EnvKind::Global(table) => {
                let names: Vec<&str> = table.iter().map(|(n, _)| n.as_ref()).collect();
                format!("global {{ {} }}", names.join(", "))
            }
            EnvKind::Local(slots) => format!("local ({} slot(s))", slots.len()),
        }
    }

    pub fn define_local(&mut self, env: EnvRef, value: ValueRef) {
        match &mut self.record_mut(env).kind {
            EnvKind::Local(slots) => slots.push(value),
            EnvKind::Global(_) => unreachable!("define_local called on the global environment"),
        }
    }

    pub fn define_global(&mut self, env: EnvRef, name: &str, value: ValueRef) {
        match &mut self.record_mut(env).kind {
            EnvKind::Global(table) => table.define(name, value),
            EnvKind::Local(_) => unreachable!("define_global called on a local environment"),
        }
    }

    pub fn get_global(&self, env: EnvRef, token: &Token) -> Result<ValueRef, RuntimeError> {
        match &self.record(env).kind {
            EnvKind::Global(table) => table.get(&token.lexeme).ok_or_else(|| {
                RuntimeError::new(token.clone(), format!("Undefined variable '{}'.", token.lexeme))
            }),
            EnvKind::Local(_) => unreachable!("get_global called on a local environment"),
        }
    }

    pub fn assign_global(&mut self, env: EnvRef, token: &Token, value: ValueRef) -> Result<(), RuntimeError> {
        match &mut self.record_mut(env).kind {
            EnvKind::Global(table) => {
                if table.assign(&token.lexeme, value) {
                    Ok(())
                } else {
                    Err(RuntimeError::new(token.clone(), format!("Undefined variable '{}'.", token.lexeme)))
                }
            }
            EnvKind::Local(_) => unreachable!("assign_global called on a local environment"),
        }
    }

    fn ancestor(&self, env: EnvRef, depth: usize) -> EnvRef {
        let mut cur = env;
        for _ in 0..depth {
            cur = self.record(cur).enclosing.expect("resolver-computed depth exceeds environment chain");
        }
        cur
    }

    pub fn get_at(&self, env: EnvRef, depth: usize, slot: u32) -> ValueRef {
        let target = self.ancestor(env, depth);
        match &self.record(target).kind {
            EnvKind::Local(slots) => slots[slot as usize],
            EnvKind::Global(_) => unreachable!("get_at resolved to the global environment"),
        }
    }

    pub fn assign_at(&mut self, env: EnvRef, depth: usize, slot: u32, value: ValueRef) {
        let target = self.ancestor(env, depth);
        match &mut self.record_mut(target).kind {
            EnvKind::Local(slots) => slots[slot as usize] = value,
            EnvKind::Global(_) => unreachable!("assign_at resolved to the global environment"),
        }
    }

    // -- collection --------------------------------------------------------

    pub fn collect(&mut self) {
        let locks: Vec<ValueRef> = self.lock_stack.clone();
        for v in locks {
            self.mark_value(v);
        }

        let active_envs: Vec<EnvRef> = self
            .envs
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                EnvSlot::Used(rec) if rec.active => Some(EnvRef(i as u32)),
                _ => None,
            })
            .collect();
        for e in active_envs {
            self.mark_env(e);
        }

        self.sweep_values();
        self.sweep_envs();

        let active_values = self.values.len() - self.value_free.len();
        let active_envs_count = self.envs.len() - self.env_free.len();
        self.value_threshold = (2 * active_values).max(self.values.len()).max(64);
        self.env_threshold = (2 * active_envs_count).max(self.envs.len()).max(16);

        self.visited += 2;
        if self.visited >= GC_MARK_WRAP {
            self.visited = 0;
        }

        #[cfg(feature = "gc-debug")]
        eprintln!(
            "gc: collected, {} values / {} envs live",
            active_values, active_envs_count
        );
    }

    fn mark_value(&mut self, r: ValueRef) {
        let idx = r.0 as usize;
        if self.values[idx].mark == self.visited {
            return;
        }
        self.values[idx].mark = self.visited;

        match self.values[idx].value.clone() {
            RawValue::Function(f) => self.mark_env(f.closure),
            RawValue::Class(c) => {
                if let Some(sup) = c.superclass {
                    self.mark_value(sup);
                }
                for (_, m) in c.methods.iter() {
                    self.mark_env(m.closure);
                }
            }
            RawValue::Instance(i) => {
                self.mark_value(i.class);
                for (_, v) in i.fields.iter() {
                    self.mark_value(*v);
                }
            }
            _ => {}
        }
    }

    fn mark_env(&mut self, e: EnvRef) {
        let idx = e.0 as usize;
        let already = match &self.envs[idx] {
            EnvSlot::Used(rec) => rec.mark == self.visited,
            EnvSlot::Free => return,
        };
        if already {
            return;
        }

        let (enclosing, values): (Option<EnvRef>, Vec<ValueRef>) = match &mut self.envs[idx] {
            EnvSlot::Used(rec) => {
                rec.mark = self.visited;
                let values = match &rec.kind {
                    EnvKind::Local(slots) => slots.clone(),
                    EnvKind::Global(table) => table.iter().map(|(_, v)| v).collect(),
                };
                (rec.enclosing, values)
            }
            EnvSlot::Free => unreachable!(),
        };

        for v in values {
            self.mark_value(v);
        }
        if let Some(enc) = enclosing {
            self.mark_env(enc);
        }
    }

    fn sweep_values(&mut self) {
        for i in 0..self.values.len() {
            if self.values[i].free {
                continue;
            }
            if self.values[i].mark != self.visited {
                self.values[i] = ValueSlot { value: RawValue::Nil, mark: GC_CLEAR, free: true };
                self.value_free.push(i as u32);
            }
        }
    }

    fn sweep_envs(&mut self) {
        for i in 0..self.envs.len() {
            let dead = match &self.envs[i] {
                EnvSlot::Used(rec) => rec.mark != self.visited,
                EnvSlot::Free => false,
            };
            if dead {
                self.envs[i] = EnvSlot::Free;
                self.env_free.push(i as u32);
            }
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
