//! Transaction composer interface

pub mod composer;

pub use composer::{
    ComposeError, ComposeOutcome, ComposeParams, Composer, ComposerKind, PreCommitError,
    PreCommitHook,
};
