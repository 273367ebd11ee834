use crate::config::TypeScriptOptions;
use crate::error::Result;
use crate::events::{Direction, EventInfo, Namespace};
use crate::naming::{make_clean_id, namespace_id};
use crate::schema::SchemaNode;
use crate::type_generator::TypeGenerator;
use crate::typescript::{print_declarations, Declaration, PropertySignature, TsType};
use log::{debug, info};

/// TypeScript integration builder - collects event function types per namespace
pub struct TypeScriptIntegration {
    generator: TypeGenerator,
    max_overloads: usize,
    /// Event aliases and namespace interfaces, in namespace order
    declarations: Vec<Declaration>,
}

impl TypeScriptIntegration {
    pub fn new(options: &TypeScriptOptions) -> Self {
        Self {
            generator: TypeGenerator::new(options.optional_props),
            max_overloads: options.max_overloads,
            declarations: Vec::new(),
        }
    }

    /// Adds the event types and the `<Ns>Actions` / `<Ns>Emission` interfaces of a namespace
    pub fn add_namespace(&mut self, namespace: &Namespace) -> Result<()> {
        let ns_id = namespace_id(&namespace.path);
        debug!("Adding namespace {} as {}", namespace.path, ns_id);

        for (direction, suffix, interface) in [
            (Direction::In, "Action", "Actions"),
            (Direction::Out, "Emission", "Emission"),
        ] {
            let mut members = Vec::new();
            for event in namespace.events_in(direction) {
                let alias = make_clean_id(&[&ns_id, &event.name, suffix]);
                let ty = self.event_type(event)?;
                self.declarations.push(Declaration::alias(alias.clone(), ty));
                members.push(PropertySignature {
                    name: event.name.clone(),
                    ty: TsType::reference(alias),
                    optional: false,
                });
            }
            self.declarations
                .push(Declaration::interface(format!("{}{}", ns_id, interface), members));
        }
        Ok(())
    }

    fn event_type(&self, event: &EventInfo) -> Result<TsType> {
        let mut schema = make_event_fn_schema(&event.payload, event.ack.as_ref(), self.max_overloads);
        if let Some(description) = &event.description {
            schema = schema.describe(description.clone());
        }
        self.generator.generate_type(&schema, event.direction)
    }

    /// Alias declarations of recursive schemas first, then the event declarations
    pub fn build(self) -> Vec<Declaration> {
        let mut declarations = self.generator.alias_declarations();
        info!(
            "Generated {} type declarations ({} aliases)",
            declarations.len() + self.declarations.len(),
            declarations.len()
        );
        declarations.extend(self.declarations);
        declarations
    }

    pub fn print(self) -> String {
        print_declarations(&self.build())
    }
}

/// Builds the function schema of an event handler.
///
/// Without an acknowledgement the payload tuple becomes the parameter list. With one, the
/// acknowledgement callback is appended as the last parameter; when the payload also has
/// a rest element, one signature per rest count `0..=max_overloads` is produced and the
/// signatures are joined in a union.
pub fn make_event_fn_schema(
    payload: &SchemaNode,
    ack: Option<&SchemaNode>,
    max_overloads: usize,
) -> SchemaNode {
    let (items, rest) = match payload.tuple_parts() {
        Some((items, rest)) => (items.to_vec(), rest.cloned()),
        None => (vec![payload.clone()], None),
    };

    let Some(ack) = ack else {
        let args = match rest {
            Some(rest) => SchemaNode::tuple(items).rest(rest),
            None => SchemaNode::tuple(items),
        };
        return SchemaNode::function(args, SchemaNode::void());
    };
    let callback = SchemaNode::function(ack.clone(), SchemaNode::void());

    let Some(rest) = rest else {
        let mut args = items;
        args.push(callback);
        return SchemaNode::function(SchemaNode::tuple(args), SchemaNode::void());
    };

    let label = rest.description().unwrap_or("Rest argument").to_string();
    let mut overloads: Vec<SchemaNode> = (0..=max_overloads)
        .map(|count| {
            let mut args = items.clone();
            args.extend((1..=count).map(|i| rest.clone().describe(format!("{} #{}", label, i))));
            args.push(callback.clone());
            SchemaNode::function(SchemaNode::tuple(args), SchemaNode::void())
        })
        .collect();

    if overloads.len() == 1 {
        overloads.remove(0)
    } else {
        SchemaNode::union(overloads)
    }
}
