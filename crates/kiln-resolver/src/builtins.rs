//! Framework plugins that resolve without touching the filesystem.

use kiln_core::{PackageJson, ResolveResult};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

/// Specifiers under this prefix are framework built-ins.
pub const BUILTIN_NAMESPACE: &str = "@kiln/";

/// Native package under the built-in namespace that must come from disk.
pub const EXCLUDED_BUILTIN: &str = "@kiln/watcher";

/// Version reported in the package stub of every built-in.
pub const BUILTIN_VERSION: &str = "2.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Bundler,
    Compressor,
    Namer,
    Optimizer,
    Packager,
    Reporter,
    Resolver,
    Runtime,
    Transformer,
}

impl PluginKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginKind::Bundler => "bundler",
            PluginKind::Compressor => "compressor",
            PluginKind::Namer => "namer",
            PluginKind::Optimizer => "optimizer",
            PluginKind::Packager => "packager",
            PluginKind::Reporter => "reporter",
            PluginKind::Resolver => "resolver",
            PluginKind::Runtime => "runtime",
            PluginKind::Transformer => "transformer",
        }
    }
}

/// A plugin linked into the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltinModule {
    pub name: &'static str,
    pub kind: PluginKind,
}

static REGISTRY: Lazy<BTreeMap<&'static str, BuiltinModule>> = Lazy::new(|| {
    use PluginKind::*;

    [
        ("@kiln/bundler-default", Bundler),
        ("@kiln/compressor-raw", Compressor),
        ("@kiln/namer-default", Namer),
        ("@kiln/optimizer-terser", Optimizer),
        ("@kiln/packager-css", Packager),
        ("@kiln/packager-html", Packager),
        ("@kiln/packager-js", Packager),
        ("@kiln/packager-raw", Packager),
        ("@kiln/reporter-dev-server-sw", Reporter),
        ("@kiln/reporter-json", Reporter),
        ("@kiln/reporter-sourcemap-visualiser", Reporter),
        ("@kiln/resolver-default", Resolver),
        ("@kiln/resolver-repl-runtimes", Resolver),
        ("@kiln/runtime-browser-hmr-sse", Runtime),
        ("@kiln/runtime-js", Runtime),
        ("@kiln/runtime-react-refresh", Runtime),
        ("@kiln/transformer-babel", Transformer),
        ("@kiln/transformer-css", Transformer),
        ("@kiln/transformer-html", Transformer),
        ("@kiln/transformer-inline-string", Transformer),
        ("@kiln/transformer-js", Transformer),
        ("@kiln/transformer-json", Transformer),
        ("@kiln/transformer-postcss", Transformer),
        ("@kiln/transformer-posthtml", Transformer),
        ("@kiln/transformer-raw", Transformer),
        ("@kiln/transformer-react-refresh-wrap", Transformer),
    ]
    .into_iter()
    .map(|(name, kind)| (name, BuiltinModule { name, kind }))
    .collect()
});

/// Whether `specifier` is answered without filesystem resolution.
///
/// This is a namespace check only; a reserved name need not be registered.
pub fn is_reserved(specifier: &str) -> bool {
    specifier.starts_with(BUILTIN_NAMESPACE) && specifier != EXCLUDED_BUILTIN
}

pub fn lookup(name: &str) -> Option<&'static BuiltinModule> {
    REGISTRY.get(name)
}

/// All registered built-ins, ordered by name.
pub fn all() -> impl Iterator<Item = &'static BuiltinModule> {
    REGISTRY.values()
}

/// Resolution of a reserved specifier: the specifier itself, a package stub,
/// and no invalidations.
pub fn builtin_result(specifier: &str) -> ResolveResult {
    let pkg = PackageJson {
        name: specifier.to_string(),
        version: Some(BUILTIN_VERSION.to_string()),
        engines: BTreeMap::from([("kiln".to_string(), BUILTIN_VERSION.to_string())]),
        ..Default::default()
    };
    ResolveResult {
        pkg: Some(pkg),
        ..ResolveResult::new(specifier)
    }
}
