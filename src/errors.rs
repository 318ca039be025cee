//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`TrellisError`] covers all failure modes including:
//! - Malformed scene descriptions and node attributes
//! - Asynchronous resource load failures
//! - Lifecycle misuse (operating on destroyed engines or nodes)
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, TrellisError>`.
//!
//! Construction errors abort scene setup and are never retried. Resource
//! load errors do not halt the render loop; they surface through the engine
//! event queue instead (the affected node keeps its previous core).

use thiserror::Error;

/// The main error type for the Trellis engine.
///
/// Each variant provides specific context about what went wrong.
#[derive(Error, Debug)]
pub enum TrellisError {
    // ========================================================================
    // Configuration Errors (fatal at construction)
    // ========================================================================
    /// A scene description record could not be resolved into a node.
    #[error("Configuration error in {context}: {message}")]
    Configuration {
        /// What was being constructed when the error occurred
        context: String,
        /// The missing or invalid field
        message: String,
    },

    /// The node kind named in a scene description is not known.
    #[error("Unknown node kind: {0:?}")]
    UnknownNodeKind(String),

    /// A user-assigned node id collided with an existing one.
    #[error("Duplicate node id: {0:?}")]
    DuplicateNodeId(String),

    /// A node kind does not understand the given attribute.
    #[error("Unknown attribute {attr:?} for {kind} node")]
    UnknownAttribute {
        /// Kind name of the node the attribute was applied to
        kind: &'static str,
        /// The offending attribute name
        attr: String,
    },

    /// An attribute value had the wrong shape.
    #[error("Attribute {attr:?} expects {expected}")]
    AttributeType {
        /// The offending attribute name
        attr: String,
        /// Description of the expected value shape
        expected: &'static str,
    },

    /// Following instance edges from this node would revisit it.
    #[error("Instance node {instance:?} creates a reference cycle through target {target:?}")]
    InstanceCycle {
        /// Id of the instance node
        instance: String,
        /// Id of the instanced target
        target: String,
    },

    // ========================================================================
    // Resource Errors (non-fatal, reported via events)
    // ========================================================================
    /// An asynchronous resource fetch failed.
    #[error("Resource load failed for {source_path:?}: {message}")]
    ResourceLoad {
        /// Source path or URL of the resource
        source_path: String,
        /// Loader-provided failure description
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// An operation was attempted on a destroyed engine, scene or node.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    // ========================================================================
    // Format & Parsing Errors
    // ========================================================================
    /// JSON parsing error in a scene description.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, TrellisError>`.
pub type Result<T> = std::result::Result<T, TrellisError>;
