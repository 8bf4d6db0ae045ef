pub mod convert_style;

use super::registry::FactoryRegistry;

pub fn register_all(registry: &mut FactoryRegistry) {
    registry.register(Box::new(convert_style::ConvertCommentStyle));
}
