//! `kestrel actions` - list registered action types and their parameters.

use super::TypeArg;
use anyhow::Result;
use kestrel_translation::ActionTypeRegistry;

pub fn list(registry: &ActionTypeRegistry, profile_type: Option<TypeArg>) -> Result<()> {
    let action_types = registry.action_types(profile_type.map(Into::into));

    println!("\n🔧 Action Types ({}):", action_types.len());
    for action_type in &action_types {
        println!();
        println!(
            "  {} [{}]",
            action_type.name(),
            action_type.supported_profile_type()
        );
        if !action_type.description().is_empty() {
            println!("    {}", action_type.description());
        }
        if action_type.parameters().is_empty() {
            println!("    (no parameters)");
        }
        for (index, parameter) in action_type.parameters().iter().enumerate() {
            let requirement = if parameter.mandatory { "required" } else { "optional" };
            let mut line = format!(
                "    {}. {} ({}, {})",
                index + 1,
                parameter.name,
                parameter.kind,
                requirement
            );
            if !parameter.description.is_empty() {
                line.push_str(&format!(" - {}", parameter.description));
            }
            println!("{}", line);
        }
    }
    Ok(())
}
