// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Script engine: one `mlua::Lua` state plus the helpers the lifecycle
//! needs around it (preloading, `arg`, `require`, task creation).

use crate::error::CoreError;
use crate::script::task::{ScriptTask, StepOutcome};
use log::{debug, Level};
use mlua::{FromLua, Function, Lua, LuaOptions, StdLib, Table, Value, Variadic};
use std::path::Path;

const SETUP_SCRIPT: &str = include_str!("setup.lua");

/// Log target of everything scripts print or log
pub const SCRIPT_LOG_TARGET: &str = "script";

fn script_level(name: &str) -> Level {
    match name {
        "error" => Level::Error,
        "warn" => Level::Warn,
        "debug" => Level::Debug,
        "trace" => Level::Trace,
        _ => Level::Info,
    }
}

/// Tab-joined text of `values`, the way `print` renders them
pub fn join_values(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::Nil => "nil".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.to_string_lossy().into_owned(),
            other => other.type_name().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\t")
}

pub fn script_log(level: &str, values: &[Value]) {
    log::log!(target: SCRIPT_LOG_TARGET, script_level(level), "{}", join_values(values));
}

pub struct ScriptEngine {
    lua: Lua,
}

impl ScriptEngine {
    pub fn new() -> Result<Self, CoreError> {
        let lua =
            Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default()).map_err(CoreError::EngineInit)?;
        Ok(Self { lua })
    }

    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Install the early bindings and run the bootstrap script
    pub fn setup(&self) -> Result<(), CoreError> {
        let host_log = self
            .lua
            .create_function(|_, (level, values): (String, Variadic<Value>)| {
                script_log(&level, &values);
                Ok(())
            })?;
        self.lua
            .load(SETUP_SCRIPT)
            .set_name("setup.lua")
            .call::<_, ()>(host_log)?;
        debug!("script engine setup done");
        Ok(())
    }

    fn package(&self) -> mlua::Result<Table> {
        self.lua.globals().get("package")
    }

    pub fn preload(&self, name: &str, loader: Function) -> mlua::Result<()> {
        let preload: Table = self.package()?.get("preload")?;
        preload.set(name, loader)
    }

    /// Preload `name` from Lua source
    pub fn preload_source(&self, name: &str, source: &[u8], chunk_name: &str) -> mlua::Result<()> {
        let f = self.lua.load(source).set_name(chunk_name).into_function()?;
        self.preload(name, f)
    }

    /// Drop `name` from `package.loaded` so the next `require` reloads it
    pub fn forget_module(&self, name: &str) -> mlua::Result<()> {
        let loaded: Table = self.package()?.get("loaded")?;
        loaded.set(name, Value::Nil)
    }

    /// Let `require` find modules in `dir`
    pub fn add_search_dir(&self, dir: &Path) -> mlua::Result<()> {
        let package = self.package()?;
        let current: String = package.get("path")?;
        let d = dir.display();
        let mut path = format!("{d}/?.lua;{d}/?/init.lua");
        if !current.is_empty() {
            path.push(';');
            path.push_str(&current);
        }
        package.set("path", path)
    }

    /// Set the global `arg` table from (index, value) pairs
    pub fn set_args(&self, args: &[(i64, String)]) -> mlua::Result<()> {
        let t = self.lua.create_table()?;
        for (i, a) in args {
            t.raw_set(*i, a.as_str())?;
        }
        self.lua.globals().set("arg", t)
    }

    pub fn require<'lua, R: FromLua<'lua>>(&'lua self, name: &str) -> mlua::Result<R> {
        let require: Function = self.lua.globals().get("require")?;
        require.call(name)
    }

    pub fn create_task(&self, f: Function) -> mlua::Result<ScriptTask> {
        ScriptTask::new(&self.lua, f)
    }

    pub fn resume(&self, task: &mut ScriptTask) -> StepOutcome {
        task.resume_one_step(&self.lua)
    }
}
