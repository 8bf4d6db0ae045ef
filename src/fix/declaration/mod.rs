pub mod add_undeclared;
pub mod convert_pointer;
pub mod insert_declaration;
pub mod move_out_of_condition;
pub mod reformat_pointer;
pub mod split;

use super::registry::FactoryRegistry;

pub fn register_all(registry: &mut FactoryRegistry) {
    registry.register(Box::new(split::SplitDeclaration));
    registry.register(Box::new(move_out_of_condition::MoveDeclarationOutOfCondition));
    registry.register(Box::new(convert_pointer::ConvertPointer));
    registry.register(Box::new(reformat_pointer::ReformatPointerDeclaration));
    registry.register(Box::new(insert_declaration::InsertDeclarationFromDefinition));
    registry.register(Box::new(add_undeclared::AddDeclarationForUndeclaredIdentifier));
}
