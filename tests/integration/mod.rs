//! Built-in revision tables run against fixture web app sources.

mod revisions;
