pub mod extract_function;
pub mod extract_literal;
pub mod move_comments;
pub mod rearrange_parameters;

use super::registry::FactoryRegistry;

pub fn register_all(registry: &mut FactoryRegistry) {
    registry.register(Box::new(extract_function::ExtractFunction));
    registry.register(Box::new(extract_literal::ExtractLiteralAsParameter));
    registry.register(Box::new(rearrange_parameters::RearrangeParameters));
    registry.register(Box::new(move_comments::MoveFunctionComments));
}
