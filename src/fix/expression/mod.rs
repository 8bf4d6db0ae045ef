pub mod assign_to_local;
pub mod numeric_literal;

use super::registry::FactoryRegistry;

pub fn register_all(registry: &mut FactoryRegistry) {
    registry.register(Box::new(numeric_literal::ConvertNumericLiteral));
    registry.register(Box::new(assign_to_local::AssignToLocalVariable));
}
