use mlua::{Lua, Table, Value, Variadic};

use crate::error::{StoreError, StoreResult};
use crate::lua::{sandbox, Script};
use crate::storage::{Op, Reply};

/// Run `script` in a fresh sandbox, routing every `redis.call(...)` to
/// `call`.
///
/// `call` is only reachable while the script runs, so a caller holding a
/// lock across this function makes the whole script atomic.
pub fn run_script<F>(script: &Script, keys: &[String], args: &[String], mut call: F) -> StoreResult<Reply>
where
    F: FnMut(Op) -> StoreResult<Reply>,
{
    let lua = sandbox::create_sandbox()?;
    let globals = lua.globals();
    globals.set("KEYS", keys.to_vec())?;
    globals.set("ARGV", args.to_vec())?;
    let redis = lua.create_table()?;
    globals.set("redis", redis.clone())?;
    sandbox::lock_globals(&lua)?;

    let reply = lua.scope(|scope| {
        let call_fn = scope.create_function_mut(move |lua, argv: Variadic<String>| {
            let op = Op::from_args(&argv).map_err(mlua::Error::external)?;
            let reply = call(op).map_err(mlua::Error::external)?;
            reply_to_lua(lua, reply)
        })?;
        redis.set("call", call_fn)?;

        let value: Value = lua.load(script.source).set_name(script.name).eval()?;
        lua_to_reply(value).map_err(mlua::Error::external)
    })?;

    Ok(reply)
}

/// Convert a store reply to the Lua value a script sees.
///
/// Nil becomes `false`, matching the server's conversion rules.
pub fn reply_to_lua(lua: &Lua, reply: Reply) -> mlua::Result<Value> {
    Ok(match reply {
        Reply::Nil => Value::Boolean(false),
        Reply::Int(n) => Value::Integer(n),
        Reply::Bulk(s) => Value::String(lua.create_string(&s)?),
        Reply::Array(items) => {
            let values = items
                .into_iter()
                .map(|item| reply_to_lua(lua, item))
                .collect::<mlua::Result<Vec<_>>>()?;
            Value::Table(lua.create_sequence_from(values)?)
        }
        Reply::Status(s) => {
            let table = lua.create_table()?;
            table.set("ok", s)?;
            Value::Table(table)
        }
    })
}

/// Convert a script's return value to a store reply.
///
/// Tables become arrays up to the first nil; numbers are truncated to
/// integers; `false` becomes nil.
pub fn lua_to_reply(value: Value) -> StoreResult<Reply> {
    match value {
        Value::Nil | Value::Boolean(false) => Ok(Reply::Nil),
        Value::Boolean(true) => Ok(Reply::Int(1)),
        Value::Integer(n) => Ok(Reply::Int(n)),
        Value::Number(n) => Ok(Reply::Int(n as i64)),
        Value::String(s) => Ok(Reply::Bulk(s.to_string_lossy().to_string())),
        Value::Table(table) => table_to_reply(table),
        other => Err(StoreError::Protocol(format!(
            "script returned unsupported {} value",
            other.type_name()
        ))),
    }
}

fn table_to_reply(table: Table) -> StoreResult<Reply> {
    if let Value::String(err) = table.raw_get::<Value>("err")? {
        return Err(StoreError::Script(err.to_string_lossy().to_string()));
    }
    if let Value::String(ok) = table.raw_get::<Value>("ok")? {
        return Ok(Reply::Status(ok.to_string_lossy().to_string()));
    }

    let mut items = Vec::new();
    for i in 1.. {
        let value: Value = table.raw_get(i)?;
        if value.is_nil() {
            break;
        }
        items.push(lua_to_reply(value)?);
    }
    Ok(Reply::Array(items))
}
