//! The `examkit add-user` command.

use anyhow::Result;

use examkit_core::model::User;

use super::Context;

pub fn execute(ctx: &Context, id: String, name: String, role: String) -> Result<()> {
    let user = match role.to_lowercase().as_str() {
        "student" => User::student(id, name),
        "teacher" => User::teacher(id, name),
        other => anyhow::bail!("unknown role: {other} (expected student or teacher)"),
    };

    let mut registry = ctx.registry()?;
    let user = registry.register_user(user)?.clone();
    ctx.save(&registry)?;

    println!("Registered {} '{}' ({})", user.role, user.name, user.id);
    Ok(())
}
