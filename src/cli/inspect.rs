//! Inspect command: what a recorded call turns into

use super::util::TargetArgs;
use utsynth::emit::{normal_case, tree, ConfiguredSeams, InstancePlan, MethodContext};
use utsynth::trace::{CallTrace, MockPlan, TestableUnit};
use utsynth::Result;

pub fn cmd_inspect(args: TargetArgs) -> Result<()> {
    let config = args.load_config()?;
    let request = args.request(&config)?;
    let trace = CallTrace::load(&request.trace_path)?;
    let root = request.target.select(&trace)?;

    let unit = TestableUnit::from_node(root);
    let mocks = MockPlan::derive(&trace, root.id);
    let seams = ConfiguredSeams::new(config.generation.seams.clone());
    let instance = InstancePlan::build(
        &root.type_name,
        &root.constructor_parameters,
        &root.fields,
        &mocks,
        &seams,
    );

    println!("{} ({})", root.label(), root.location);
    println!("  Trace: {}", request.trace_path.display());

    println!("\nParameters:");
    if unit.parameters.is_empty() {
        println!("  (none)");
    }
    for param in &unit.parameters {
        let value = param.value.as_deref().unwrap_or("null");
        match &param.interface {
            Some(binding) => println!(
                "  {} {} -> mock of {} ({})",
                param.type_name, param.name, binding.interface_type, binding.runtime_type
            ),
            None => println!("  {} {} = {}", param.type_name, param.name, value),
        }
    }
    if unit.is_void() {
        println!("Returns: void");
    } else {
        println!(
            "Returns: {} = {}",
            unit.output.type_name,
            unit.output.value.as_deref().unwrap_or("null")
        );
    }

    println!("\nMocks ({}):", mocks.requirements.len());
    for requirement in &mocks.requirements {
        println!(
            "  {}: Mock<{}> ({} call(s))",
            requirement.variable,
            requirement.interface_type,
            requirement.calls.len()
        );
        for call in &requirement.calls {
            let returns = if call.returns.is_void() {
                "void".to_string()
            } else {
                call.returns.value.clone().unwrap_or_else(|| "null".into())
            };
            println!("    {} -> {}", call.signature(), returns);
        }
    }

    if !mocks.unresolved.is_empty() {
        println!("\n⚠ Unresolved calls ({}):", mocks.unresolved.len());
        for call in &mocks.unresolved {
            println!(
                "  {}.{} {}: {}",
                call.type_name, call.method_name, call.correlation, call.reason
            );
        }
    }

    let ctx = MethodContext {
        unit: &unit,
        mocks: &mocks,
        instance: &instance,
        framework: config.generation.framework,
    };
    let method = normal_case(&ctx);
    println!("\nNormal-case test:\n");
    print!("{}", tree::render(&method.stmts, 1));

    Ok(())
}
