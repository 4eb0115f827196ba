//! CRUD capabilities for entity types.
//!
//! # Design
//! Each operation is its own trait with default methods, so an entity opts
//! into exactly the subset its API supports. `Crud` is a marker for types
//! that have all five.
//!
//! Conventional URLs are `{base_url}{PATH}` for collections and
//! `{base_url}{PATH}/{id}` for members. The `*_path` methods can be
//! overridden; an override is used verbatim and does not get the base URL
//! prepended.

use async_trait::async_trait;

use crate::attributes::{FromJson, ToAttributes};
use crate::client::Client;
use crate::error::ApiError;
use crate::http::{HttpMethod, Params};

/// Success marker for calls whose body is irrelevant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Okay;

/// Static declarations shared by every capability.
pub trait Resource {
    /// Appended to the base URL, e.g. `"items"`.
    const PATH: &'static str;
    /// Envelope key around a single entity, e.g. `{"item": {...}}`.
    const OBJECT_KEY: Option<&'static str> = None;
}

/// Numeric primary key used in member paths.
pub trait Identified {
    fn id(&self) -> u64;
}

/// `{PATH}/{id}` without the base URL.
pub fn member_path(path: &str, id: u64) -> String {
    format!("{path}/{id}")
}

/// POST a new entity.
#[async_trait]
pub trait Creatable: Resource + FromJson + Send + 'static {
    fn create_path(client: &Client) -> String {
        client.url(Self::PATH)
    }

    async fn create(client: &Client, attributes: Params) -> Result<Self, ApiError> {
        client
            .execute_object(
                HttpMethod::Post,
                Self::create_path(client),
                Some(attributes),
                Self::OBJECT_KEY,
            )
            .await
    }

    async fn create_okay(client: &Client, attributes: Params) -> Result<Okay, ApiError> {
        client
            .execute_okay(HttpMethod::Post, Self::create_path(client), Some(attributes))
            .await
    }
}

/// GET a single entity.
#[async_trait]
pub trait Readable: Resource + Identified + FromJson + Send + Sync + 'static {
    fn read_path(&self, client: &Client) -> String {
        client.url(&member_path(Self::PATH, self.id()))
    }

    /// Fetch the latest version of this entity.
    async fn read(&self, client: &Client, query: Option<Params>) -> Result<Self, ApiError> {
        client
            .execute_object(HttpMethod::Get, self.read_path(client), query, Self::OBJECT_KEY)
            .await
    }

    /// Fetch by id without an existing instance. Always uses the
    /// conventional member path.
    async fn read_by_id(client: &Client, id: u64, query: Option<Params>) -> Result<Self, ApiError> {
        client
            .execute_object(
                HttpMethod::Get,
                client.url(&member_path(Self::PATH, id)),
                query,
                Self::OBJECT_KEY,
            )
            .await
    }
}

/// GET the collection.
#[async_trait]
pub trait Enumerable: Resource + FromJson + Send + 'static {
    /// Envelope key around the list, e.g. `{"items": [...]}`. May differ
    /// from `OBJECT_KEY`.
    const COLLECTION_KEY: Option<&'static str> = None;

    fn enumerate_path(client: &Client) -> String {
        client.url(Self::PATH)
    }

    async fn list(client: &Client, query: Option<Params>) -> Result<Vec<Self>, ApiError> {
        client
            .execute_collection(
                HttpMethod::Get,
                Self::enumerate_path(client),
                query,
                Self::COLLECTION_KEY,
            )
            .await
    }
}

/// PUT this entity's attributes.
#[async_trait]
pub trait Updatable: Resource + Identified + ToAttributes + FromJson + Send + Sync + 'static {
    fn update_path(&self, client: &Client) -> String {
        client.url(&member_path(Self::PATH, self.id()))
    }

    /// `valued_only` sends only attributes with a value; otherwise explicit
    /// nulls are sent too, clearing those fields server-side.
    fn update_params(&self, valued_only: bool) -> Result<Params, ApiError> {
        let params = if valued_only {
            self.valued_attributes()
        } else {
            self.nullified_attributes()
        };
        params.map_err(ApiError::encode)
    }

    async fn update(&self, client: &Client, valued_only: bool) -> Result<Self, ApiError> {
        let params = self.update_params(valued_only)?;
        client
            .execute_object(
                HttpMethod::Put,
                self.update_path(client),
                Some(params),
                Self::OBJECT_KEY,
            )
            .await
    }

    async fn update_okay(&self, client: &Client, valued_only: bool) -> Result<Okay, ApiError> {
        let params = self.update_params(valued_only)?;
        client
            .execute_okay(HttpMethod::Put, self.update_path(client), Some(params))
            .await
    }
}

/// DELETE this entity.
#[async_trait]
pub trait Deletable: Resource + Identified + Send + Sync + 'static {
    fn delete_path(&self, client: &Client) -> String {
        client.url(&member_path(Self::PATH, self.id()))
    }

    async fn delete(&self, client: &Client) -> Result<Okay, ApiError> {
        client
            .execute_okay(HttpMethod::Delete, self.delete_path(client), None)
            .await
    }
}

/// All five capabilities.
pub trait Crud: Creatable + Readable + Updatable + Deletable + Enumerable {}

impl<T> Crud for T where T: Creatable + Readable + Updatable + Deletable + Enumerable {}
