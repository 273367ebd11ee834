//! Schema Depict - documentation and static types from event schema trees.
//!
//! Event arguments are described as schema trees. The same trees are depicted twice: as
//! AsyncAPI (JSON Schema draft-07) documentation and as TypeScript declarations. Both
//! depictions run the same generic walker with a different rule set.
//!
//! # Architecture
//!
//! 1. [`schema`] - Schema trees, their builder API and the validation primitive
//! 2. [`walker`] - Generic dispatch of schema kinds to a [`walker::RuleSet`]
//! 3. [`alias`] and [`fingerprint`] - Named aliases for self-referential schemas
//! 4. [`schema_generator`] - Documentation rule set producing schema objects
//! 5. [`type_generator`] and [`typescript`] - Static type rule set, type AST and printer
//! 6. [`asyncapi_builder`] - Channels, messages and operations per namespace
//! 7. [`integration`] - Event function types and namespace interfaces
//! 8. [`manifest`] and [`scanner`] - Declarative YAML/JSON input
//! 9. [`serializer`] - Writes the artifacts as YAML, JSON or TypeScript text
//!
//! # Example Usage
//!
//! ```no_run
//! use schema_depict::{
//!     asyncapi_builder::AsyncApiBuilder,
//!     config::GeneratorConfig,
//!     events::{Direction, EventInfo, Namespace},
//!     integration::TypeScriptIntegration,
//!     schema::SchemaNode,
//!     schema_generator::SchemaGenerator,
//!     serializer::serialize_yaml,
//! };
//!
//! let chat = Namespace::new("/chat").with_event(
//!     EventInfo::new("message", Direction::In, SchemaNode::tuple(vec![SchemaNode::string()]))
//!         .with_ack(SchemaNode::tuple(vec![SchemaNode::boolean()])),
//! );
//! let config = GeneratorConfig::default();
//!
//! let schema_gen = SchemaGenerator::new();
//! let mut builder = AsyncApiBuilder::new(&config);
//! builder.add_namespace(&chat, &schema_gen).unwrap();
//! println!("{}", serialize_yaml(&builder.build(schema_gen)).unwrap());
//!
//! let mut types = TypeScriptIntegration::new(&config.typescript);
//! types.add_namespace(&chat).unwrap();
//! println!("{}", types.print());
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod alias;
pub mod asyncapi_builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod fingerprint;
pub mod integration;
pub mod manifest;
pub mod naming;
pub mod probe;
pub mod scanner;
pub mod schema;
pub mod schema_generator;
pub mod serializer;
pub mod type_generator;
pub mod typescript;
pub mod walker;
