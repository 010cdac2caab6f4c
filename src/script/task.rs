// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Cooperative task resumed one step per host tick.
//!
//! The task is a Lua coroutine anchored in the registry, so the handle
//! itself carries no lifetime and can sit next to the engine in the core.

use mlua::{Function, Lua, MultiValue, RegistryKey, Thread, ThreadStatus, Value};

/// Result of one resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Yielded; resumes from the same point next time
    Suspended,
    /// Returned, with the first returned value rendered as text if any
    Completed(Option<String>),
    /// Raised an error
    Failed(String),
}

pub struct ScriptTask {
    key: Option<RegistryKey>,
    steps: u64,
}

impl ScriptTask {
    /// Wrap `f` in a coroutine; nothing runs until the first resume
    pub fn new(lua: &Lua, f: Function) -> mlua::Result<Self> {
        let thread = lua.create_thread(f)?;
        Ok(Self {
            key: Some(lua.create_registry_value(thread)?),
            steps: 0,
        })
    }

    /// Number of resumes performed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_finished(&self) -> bool {
        self.key.is_none()
    }

    /// Resume exactly once. A finished task is never resumed again and
    /// answers `Completed(None)`.
    pub fn resume_one_step(&mut self, lua: &Lua) -> StepOutcome {
        let Some(key) = &self.key else {
            return StepOutcome::Completed(None);
        };
        let thread: Thread = match lua.registry_value(key) {
            Ok(t) => t,
            Err(e) => {
                self.release(lua);
                return StepOutcome::Failed(e.to_string());
            }
        };
        if !matches!(thread.status(), ThreadStatus::Resumable) {
            self.release(lua);
            return StepOutcome::Completed(None);
        }

        self.steps += 1;
        let result = thread.resume::<_, MultiValue>(());
        match result {
            Ok(values) => {
                if matches!(thread.status(), ThreadStatus::Resumable) {
                    return StepOutcome::Suspended;
                }
                let first = values.into_iter().next().and_then(describe);
                self.release(lua);
                StepOutcome::Completed(first)
            }
            Err(e) => {
                self.release(lua);
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    /// Drop the coroutine from the registry
    pub fn release(&mut self, lua: &Lua) {
        if let Some(key) = self.key.take() {
            let _ = lua.remove_registry_value(key);
        }
    }
}

fn describe(v: Value) -> Option<String> {
    match v {
        Value::Nil => None,
        Value::Boolean(b) => Some(b.to_string()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.to_string_lossy().into_owned()),
        other => Some(other.type_name().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(lua: &Lua, src: &str) -> ScriptTask {
        let f = lua.load(src).into_function().unwrap();
        ScriptTask::new(lua, f).unwrap()
    }

    #[test]
    fn test_one_step_per_resume() {
        let lua = Lua::new();
        let mut t = task(
            &lua,
            "for i = 1, 3 do trace = i; coroutine.yield() end return 'done'",
        );
        for i in 1..=3 {
            assert_eq!(t.resume_one_step(&lua), StepOutcome::Suspended);
            assert_eq!(lua.globals().get::<_, i64>("trace").unwrap(), i);
        }
        assert_eq!(
            t.resume_one_step(&lua),
            StepOutcome::Completed(Some("done".to_string()))
        );
        assert!(t.is_finished());
        assert_eq!(t.steps(), 4);
        // finished tasks are left alone
        assert_eq!(t.resume_one_step(&lua), StepOutcome::Completed(None));
        assert_eq!(t.steps(), 4);
    }

    #[test]
    fn test_error_fails_task() {
        let lua = Lua::new();
        let mut t = task(&lua, "coroutine.yield() error('boom')");
        assert_eq!(t.resume_one_step(&lua), StepOutcome::Suspended);
        match t.resume_one_step(&lua) {
            StepOutcome::Failed(msg) => assert!(msg.contains("boom")),
            other => panic!("unexpected {:?}", other),
        }
        assert!(t.is_finished());
    }

    #[test]
    fn test_release_stops_task() {
        let lua = Lua::new();
        let mut t = task(&lua, "while true do coroutine.yield() end");
        assert_eq!(t.resume_one_step(&lua), StepOutcome::Suspended);
        t.release(&lua);
        assert_eq!(t.resume_one_step(&lua), StepOutcome::Completed(None));
    }
}
