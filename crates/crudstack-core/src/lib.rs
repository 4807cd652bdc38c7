//! Expression-and-argument compiler for declarative key/attribute data access.
//!
//! Operations are declared as [`OperationDescriptor`]s: a kind, a target
//! table, an ordered parameter list, and expression templates that refer to
//! attribute names through `#name` placeholders and to runtime values
//! through `:value` placeholders. The [`Compiler`] validates every
//! declaration once, failing the whole registration on the first error.
//! Each call then binds its arguments, resolves the placeholders, and
//! produces a storage request object. The [`Dispatcher`] executes that request
//! against a [`StorageEngine`](crudstack_model::StorageEngine) and shapes the
//! response.
//!
//! ```text
//! descriptor -> Signature -> factory          (registration, once)
//! arguments  -> bind -> request -> engine     (every call)
//! ```
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod argument;
pub mod codec;
pub mod compiler;
pub mod config;
pub mod crud;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod expression;
pub mod factory;
pub mod page;
pub mod signature;

pub use argument::{ArgValue, Argument, Arguments, bind, bind_named};
pub use codec::{AttributeCodec, JsonAttributeCodec, from_item, to_item};
pub use compiler::{CompiledOperation, Compiler, CompilerBuilder};
pub use config::CrudConfig;
pub use crud::{Crud, CrudMethod, crud_descriptors};
pub use descriptor::{
    DescriptorSet, OperationDescriptor, ParamRole, ParamType, ParameterDescriptor,
    TransactItemDescriptor, TransactItemKind,
};
pub use dispatcher::{Dispatcher, Outcome};
pub use error::{BindError, CodecError, CompileError, CrudError, CrudResult};
pub use factory::Request;
pub use page::PageResult;
pub use signature::Signature;
