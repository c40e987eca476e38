use crux_core::capability::{CapabilityContext, Operation};
use futures::StreamExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::subscriptions::SubscriptionId;

/// One stored document: its id plus the raw field map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("document '{id}' could not be decoded: {reason}")]
pub struct DecodeError {
    pub id: String,
    pub reason: String,
}

impl Document {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_value(self.data.clone()).map_err(|e| DecodeError {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
}

impl Query {
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            filters: Vec::new(),
            order_by: None,
        }
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op: FilterOp::Equal,
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum StoreOperation {
    Get {
        collection: String,
        id: String,
    },
    /// Writes only the given fields, leaving the rest of the document intact.
    SetMerge {
        collection: String,
        id: String,
        fields: Value,
    },
    Add {
        collection: String,
        data: Value,
    },
    Subscribe {
        subscription: SubscriptionId,
        query: Query,
    },
    Unsubscribe {
        subscription: SubscriptionId,
    },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum StoreError {
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    #[error("unexpected store response")]
    UnexpectedOutput,

    #[error("store error: {message}")]
    Other { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum StoreOutput {
    Document(Option<Document>),
    Written,
    Added { id: String },
    Snapshot(Vec<Document>),
    Unsubscribed,
}

pub type StoreResult = Result<StoreOutput, StoreError>;

impl Operation for StoreOperation {
    type Output = StoreResult;
}

#[derive(crux_core::macros::Capability)]
pub struct DocumentStore<Ev> {
    context: CapabilityContext<StoreOperation, Ev>,
}

impl<Ev> DocumentStore<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<StoreOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn get<F>(&self, collection: &str, id: &str, make_event: F)
    where
        F: FnOnce(Result<Option<Document>, StoreError>) -> Ev + Send + 'static,
    {
        let operation = StoreOperation::Get {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = match ctx.request_from_shell(operation).await {
                Ok(StoreOutput::Document(doc)) => Ok(doc),
                Ok(_) => Err(StoreError::UnexpectedOutput),
                Err(e) => Err(e),
            };
            ctx.update_app(make_event(result));
        });
    }

    pub fn set_merge<F>(&self, collection: &str, id: &str, fields: Value, make_event: F)
    where
        F: FnOnce(Result<(), StoreError>) -> Ev + Send + 'static,
    {
        let operation = StoreOperation::SetMerge {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        };
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = ctx.request_from_shell(operation).await.map(|_| ());
            ctx.update_app(make_event(result));
        });
    }

    pub fn add<F>(&self, collection: &str, data: Value, make_event: F)
    where
        F: FnOnce(Result<String, StoreError>) -> Ev + Send + 'static,
    {
        let operation = StoreOperation::Add {
            collection: collection.to_string(),
            data,
        };
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = match ctx.request_from_shell(operation).await {
                Ok(StoreOutput::Added { id }) => Ok(id),
                Ok(_) => Err(StoreError::UnexpectedOutput),
                Err(e) => Err(e),
            };
            ctx.update_app(make_event(result));
        });
    }

    /// Live query; every snapshot (or error) is delivered tagged with the subscription.
    pub fn subscribe<F>(&self, subscription: SubscriptionId, query: Query, make_event: F)
    where
        F: Fn(SubscriptionId, Result<Vec<Document>, StoreError>) -> Ev + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let mut stream = ctx.stream_from_shell(StoreOperation::Subscribe {
                subscription: subscription.clone(),
                query,
            });
            while let Some(output) = stream.next().await {
                let delivered = match output {
                    Ok(StoreOutput::Snapshot(docs)) => Ok(docs),
                    Ok(StoreOutput::Unsubscribed) => break,
                    Ok(_) => Err(StoreError::UnexpectedOutput),
                    Err(e) => Err(e),
                };
                ctx.update_app(make_event(subscription.clone(), delivered));
            }
        });
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(StoreOperation::Unsubscribe { subscription })
                .await;
        });
    }
}
