pub mod camel_case;

use super::registry::FactoryRegistry;

pub fn register_all(registry: &mut FactoryRegistry) {
    registry.register(Box::new(camel_case::ConvertToCamelCase));
}
