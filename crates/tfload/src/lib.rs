//! # tfload - terraform configuration loader
//!
//! The configuration-resolution core of a Terraform static analyzer: it
//! turns a directory of `.tf` files into a fully resolved in-memory tree of
//! modules, and loads `.tfvars` override files in precedence order. Rule
//! evaluation happens elsewhere; this crate only resolves structure and raw
//! literal values.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfload` works internally.
//!
//! ### HCL Terms
//!
//! Quick introduction to terms used to describe elements of HCL documents.
//!
//! In hcl terms...
//! - a file gets parsed as a `body`
//! - ...which is just a list of `structures`
//! - ...where there are two kinds:
//!   - `attribute`: a "key = value" pair
//!   - or `block`:
//!     - 1 `identifier`
//!     - followed by 0 or more `labels`
//!     - and a `body` enclosed in `{` and `}`
//!
//! A Terraform module call is simply a block with identifier `module`, one
//! label (the call name) and a `source` attribute:
//!
//! ```hcl
//! module "consul" {
//!   source = "hashicorp/consul/aws"
//! }
//! ```
//!
//! ### Loading configurations
//!
//! Everything starts at [loader::Loader]. Each `.tf` file is parsed with
//! [hcl_edit::parser::parse_body] and its raw text is recorded in the
//! loader's file registry under a path relative to the loader's base
//! directory, so later diagnostic rendering can point at real source. Parse
//! failures are collected per file; sibling files in the same directory are
//! still attempted.
//!
//! ### Module calls and walking
//!
//! `load_config` extracts the `module` blocks of a directory
//! ([module::ModuleCall]), resolves where each call's source lives and
//! recurses. A `./` or `../` address joins onto the calling directory; every
//! other address is looked up in the manifest `terraform init` left behind
//! ([manifest::ModuleManifest]). How far the recursion descends is a
//! [module::ModuleWalkMode]; depth is bounded instead of cycle-checked, so a
//! circular reference surfaces as a "stack level too deep" diagnostic that
//! carries the call path.
//!
//! ### Values files
//!
//! `load_values_files` collects `terraform.tfvars`, `*.auto.tfvars` and
//! explicitly named files into an ordered `Vec` of [value::InputValues].
//! The order is the precedence; merging (and therefore shadowing) is the
//! caller's business. Values files may only contain constant assignments -
//! see [value::Value].
//!
//! ### Diagnostics
//!
//! Nothing in this crate throws for bad configuration. Every operation
//! returns a best-effort result plus a [diagnostics::Diagnostics] aggregate
//! collected across the whole walk, rendered in the
//! `<file>:<line>,<col>-<col>: <summary>; <detail>` form callers match on.
//!
pub mod diagnostics;
pub mod fs;
pub mod loader;
pub mod manifest;
pub mod module;
mod util;
pub mod value;
