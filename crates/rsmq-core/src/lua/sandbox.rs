use mlua::{Lua, LuaOptions, StdLib};

/// Base functions that reach outside the VM or load code.
const REMOVED_GLOBALS: [&str; 5] = ["loadfile", "dofile", "load", "collectgarbage", "print"];

const LOCK_GLOBALS: &str = r#"
setmetatable(_G, {
    __newindex = function(_, name)
        error("Script attempted to create global variable '" .. tostring(name) .. "'", 2)
    end,
    __index = function(_, name)
        error("Script attempted to access nonexistent global variable '" .. tostring(name) .. "'", 2)
    end,
})
"#;

/// Create a VM shaped like the server's scripting environment: math,
/// string and table libraries plus the base functions, with no filesystem
/// or code loading.
pub fn create_sandbox() -> mlua::Result<Lua> {
    let lua = Lua::new_with(
        StdLib::MATH | StdLib::STRING | StdLib::TABLE,
        LuaOptions::default(),
    )?;

    let globals = lua.globals();
    for name in REMOVED_GLOBALS {
        globals.set(name, mlua::Value::Nil)?;
    }

    Ok(lua)
}

/// Reject reads of undefined globals and any new global assignment, as the
/// server does. Call after `KEYS`, `ARGV` and `redis` are installed.
pub fn lock_globals(lua: &Lua) -> mlua::Result<()> {
    lua.load(LOCK_GLOBALS).set_name("lock_globals").exec()
}
