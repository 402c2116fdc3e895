//! `agentloop tools`: list the registered tools.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = agentloop_tools::default_registry();

    println!("{} tools available", registry.len());
    println!();
    for def in registry.definitions() {
        println!("  {:<10} {}", def.name, def.description);
        let required: Vec<&str> = def.parameters["required"]
            .as_array()
            .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();
        if let Some(props) = def.parameters["properties"].as_object() {
            for (name, spec) in props {
                let kind = spec["type"].as_str().unwrap_or("any");
                let flag = if required.contains(&name.as_str()) {
                    "required"
                } else {
                    "optional"
                };
                println!("  {:<10}   {name}: {kind} ({flag})", "");
            }
        }
    }
    Ok(())
}
