//! Buildtype defaults table.
//!
//! Values the project file may omit (most importantly the build image
//! architecture) are looked up here by buildtype.

/// Defaults for one buildtype.
struct Entry {
    buildtype: &'static str,
    arch: &'static str,
    interpreter: &'static str,
    console: &'static str,
    machine: &'static str,
    nicmodel: &'static str,
}

const TABLE: &[Entry] = &[
    Entry {
        buildtype: "nodefaults",
        arch: "i386",
        interpreter: "qemu-system-i386",
        console: "ttyS0,115200",
        machine: "pc",
        nicmodel: "e1000",
    },
    Entry {
        buildtype: "i386",
        arch: "i386",
        interpreter: "qemu-system-i386",
        console: "ttyS0,115200",
        machine: "pc",
        nicmodel: "e1000",
    },
    Entry {
        buildtype: "amd64",
        arch: "amd64",
        interpreter: "qemu-system-x86_64",
        console: "ttyS0,115200",
        machine: "pc",
        nicmodel: "e1000",
    },
    Entry {
        buildtype: "armel",
        arch: "armel",
        interpreter: "qemu-system-arm",
        console: "ttyAMA0,115200",
        machine: "versatilepb",
        nicmodel: "smc91c111",
    },
    Entry {
        buildtype: "armhf",
        arch: "armhf",
        interpreter: "qemu-system-arm",
        console: "ttyAMA0,115200",
        machine: "versatilepb",
        nicmodel: "smc91c111",
    },
    Entry {
        buildtype: "aarch64",
        arch: "arm64",
        interpreter: "qemu-system-aarch64",
        console: "ttyAMA0,115200",
        machine: "virt",
        nicmodel: "virtio",
    },
    Entry {
        buildtype: "ppc",
        arch: "powerpc",
        interpreter: "qemu-system-ppc",
        console: "ttyPZ0,115200",
        machine: "mac99",
        nicmodel: "rtl8139",
    },
];

/// Default values resolved for a single buildtype.
#[derive(Debug, Clone, Copy)]
pub struct Defaults {
    entry: &'static Entry,
}

impl Defaults {
    /// Defaults for `buildtype`; unknown buildtypes get the `nodefaults` row.
    pub fn for_buildtype(buildtype: &str) -> Self {
        let entry = TABLE
            .iter()
            .find(|e| e.buildtype == buildtype)
            .unwrap_or(&TABLE[0]);
        Self { entry }
    }

    /// The buildtype this row belongs to.
    pub fn buildtype(&self) -> &'static str {
        self.entry.buildtype
    }

    /// Look up a default by key.
    pub fn lookup(&self, key: &str) -> Option<&'static str> {
        match key {
            "arch" => Some(self.entry.arch),
            "interpreter" => Some(self.entry.interpreter),
            "console" => Some(self.entry.console),
            "machine" => Some(self.entry.machine),
            "nicmodel" => Some(self.entry.nicmodel),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.buildtype)
    }
}

/// Resolve the buildtype: command line, then `project/buildtype`, then `nodefaults`.
pub fn resolve_buildtype(cli: Option<&str>, project: Option<String>) -> String {
    cli.map(str::to_string)
        .or(project.filter(|b| !b.is_empty()))
        .unwrap_or_else(|| "nodefaults".to_string())
}
