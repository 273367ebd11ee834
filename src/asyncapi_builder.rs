use crate::config::{DocumentInfo, GeneratorConfig, SecurityScheme, Server};
use crate::error::Result;
use crate::events::{Direction, EventInfo, Namespace};
use crate::naming::{make_clean_id, namespace_id};
use crate::schema_generator::{SchemaGenerator, SchemaObject};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ASYNCAPI_VERSION: &str = "3.0.0";
const WS_BINDING_VERSION: &str = "0.1.0";

/// AsyncAPI document builder
pub struct AsyncApiBuilder {
    /// AsyncAPI info section
    info: DocumentInfo,
    servers: IndexMap<String, Server>,
    /// Channels collection (namespace id -> Channel)
    channels: IndexMap<String, Channel>,
    /// Operations collection (operation id -> Operation)
    operations: IndexMap<String, Operation>,
    security_schemes: IndexMap<String, SecurityScheme>,
}

/// Complete AsyncAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsyncApiDocument {
    /// AsyncAPI version
    pub asyncapi: String,
    pub info: DocumentInfo,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub servers: IndexMap<String, Server>,
    pub channels: IndexMap<String, Channel>,
    pub operations: IndexMap<String, Operation>,
    /// Components (schemas, security schemes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

/// AsyncAPI Channel object - one per namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Namespace path
    pub address: String,
    pub messages: IndexMap<String, Message>,
    pub bindings: ChannelBindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelBindings {
    pub ws: WsChannelBinding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsChannelBinding {
    #[serde(rename = "bindingVersion")]
    pub binding_version: String,
}

/// AsyncAPI Message object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Event name
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Schema of the argument list
    pub payload: SchemaObject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<MessageExample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageExample {
    pub payload: Value,
}

/// AsyncAPI Operation object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub action: OperationAction,
    pub channel: Reference,
    pub messages: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<Reference>,
    /// Acknowledgement sent back by the other side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<OperationReply>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationAction {
    Send,
    Receive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationReply {
    pub channel: Reference,
    pub messages: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "$ref")]
    pub reference: String,
}

/// AsyncAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    /// Schema definitions of recursive schemas
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, SchemaObject>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

impl Reference {
    fn to(target: String) -> Self {
        Self { reference: target }
    }
}

impl From<Direction> for OperationAction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::In => OperationAction::Receive,
            Direction::Out => OperationAction::Send,
        }
    }
}

impl AsyncApiBuilder {
    /// Create a new AsyncApiBuilder from the generator configuration
    pub fn new(config: &GeneratorConfig) -> Self {
        debug!("Initializing AsyncApiBuilder");
        Self {
            info: config.info.clone(),
            servers: config.servers.clone(),
            channels: IndexMap::new(),
            operations: IndexMap::new(),
            security_schemes: config.security_schemes.clone(),
        }
    }

    /// Add a namespace channel with its messages and operations
    pub fn add_namespace(&mut self, namespace: &Namespace, schema_gen: &SchemaGenerator) -> Result<()> {
        let channel_id = namespace_id(&namespace.path);
        debug!("Adding channel {} for namespace {}", channel_id, namespace.path);

        for scheme in &namespace.security {
            if !self.security_schemes.contains_key(scheme) {
                warn!(
                    "Namespace {} refers to undeclared security scheme {}",
                    namespace.path, scheme
                );
            }
        }

        let mut messages = IndexMap::new();
        for event in &namespace.events {
            let operation = self.add_event(&channel_id, namespace, event, schema_gen, &mut messages)?;
            let operation_id = make_clean_id(&[
                &channel_id,
                operation_verb(event.direction),
                &event.name,
            ]);
            self.operations.insert(operation_id, operation);
        }

        self.channels.insert(
            channel_id,
            Channel {
                address: namespace.path.clone(),
                messages,
                bindings: ChannelBindings {
                    ws: WsChannelBinding {
                        binding_version: WS_BINDING_VERSION.to_string(),
                    },
                },
            },
        );
        Ok(())
    }

    fn add_event(
        &self,
        channel_id: &str,
        namespace: &Namespace,
        event: &EventInfo,
        schema_gen: &SchemaGenerator,
        messages: &mut IndexMap<String, Message>,
    ) -> Result<Operation> {
        let flow = flow_label(event.direction);
        let message_id = make_clean_id(&[&event.name, flow]);
        debug!("Adding message {} to channel {}", message_id, channel_id);

        messages.insert(
            message_id.clone(),
            Message {
                name: event.name.clone(),
                title: event.name.clone(),
                summary: event.description.clone(),
                payload: schema_gen.generate_schema(&event.payload, event.direction)?,
                examples: event
                    .examples
                    .iter()
                    .map(|payload| MessageExample {
                        payload: payload.clone(),
                    })
                    .collect(),
            },
        );

        let reply = match &event.ack {
            Some(ack) => {
                let ack_id = make_clean_id(&[&event.name, flow, "ack"]);
                messages.insert(
                    ack_id.clone(),
                    Message {
                        name: event.name.clone(),
                        title: format!("Acknowledgement for {}", event.name),
                        summary: None,
                        payload: schema_gen.generate_schema(ack, event.direction.flip())?,
                        examples: Vec::new(),
                    },
                );
                Some(OperationReply {
                    channel: channel_ref(channel_id),
                    messages: vec![message_ref(channel_id, &ack_id)],
                })
            }
            None => None,
        };

        Ok(Operation {
            action: event.direction.into(),
            channel: channel_ref(channel_id),
            messages: vec![message_ref(channel_id, &message_id)],
            summary: event.description.clone(),
            security: namespace
                .security
                .iter()
                .map(|scheme| Reference::to(format!("#/components/securitySchemes/{}", scheme)))
                .collect(),
            reply,
        })
    }

    /// Build the final AsyncAPI document
    pub fn build(self, schema_gen: SchemaGenerator) -> AsyncApiDocument {
        debug!("Building final AsyncAPI document");

        let schemas = schema_gen.into_schemas();
        let components = if schemas.is_empty() && self.security_schemes.is_empty() {
            None
        } else {
            Some(Components {
                schemas,
                security_schemes: self.security_schemes,
            })
        };

        info!(
            "Built document with {} channels and {} operations",
            self.channels.len(),
            self.operations.len()
        );
        AsyncApiDocument {
            asyncapi: ASYNCAPI_VERSION.to_string(),
            info: self.info,
            servers: self.servers,
            channels: self.channels,
            operations: self.operations,
            components,
        }
    }
}

fn flow_label(direction: Direction) -> &'static str {
    match direction {
        Direction::In => "incoming",
        Direction::Out => "outgoing",
    }
}

fn operation_verb(direction: Direction) -> &'static str {
    match direction {
        Direction::In => "receive",
        Direction::Out => "send",
    }
}

fn channel_ref(channel_id: &str) -> Reference {
    Reference::to(format!("#/channels/{}", channel_id))
}

fn message_ref(channel_id: &str, message_id: &str) -> Reference {
    Reference::to(format!("#/channels/{}/messages/{}", channel_id, message_id))
}
