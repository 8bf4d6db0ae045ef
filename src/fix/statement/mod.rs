pub mod add_braces;
pub mod complete_switch;
pub mod optimize_for_loop;
pub mod split_if;

use super::registry::FactoryRegistry;

pub fn register_all(registry: &mut FactoryRegistry) {
    registry.register(Box::new(add_braces::AddBraces));
    registry.register(Box::new(split_if::SplitIfStatement));
    registry.register(Box::new(complete_switch::CompleteSwitchCase));
    registry.register(Box::new(optimize_for_loop::OptimizeForLoop));
}
