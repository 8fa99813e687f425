use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use regex::Regex;
use ristretto_classfile::{ClassAccessFlags, ClassFile};
use thiserror::Error;
use zip::ZipArchive;

use symdex_api::models::util::wildcard_regex;
use symdex_api::models::{AccessRule, Accessibility, ContainerRef, TypeEntry, TypeKind};
use symdex_api::reader::{BoxError, ContainerReader};

#[derive(Debug, Error)]
pub enum JavaReadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("Class file error in {member}: {detail}")]
    ClassFile { member: String, detail: String },
    #[error("Unsupported container format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Reads declared types out of a jar (zip) archive on the classpath.
///
/// Every parseable `.class` member yields one `TypeEntry`; local and
/// anonymous classes, synthetic types and `module-info`/`package-info`
/// members are skipped.
#[derive(Debug, Default)]
pub struct JarContainerReader;

impl JarContainerReader {
    pub fn new() -> Self {
        Self
    }

    fn read_entries(&self, container: &ContainerRef) -> Result<Vec<TypeEntry>, JavaReadError> {
        let mut file = File::open(&container.path)?;
        let mut magic = [0u8; 4];
        if file.read(&mut magic)? < 4 || magic[0] != 0x50 || magic[1] != 0x4B {
            return Err(JavaReadError::UnsupportedFormat(container.path.clone()));
        }
        file.seek(SeekFrom::Start(0))?;

        let rules = compile_access_rules(&container.access_rules);
        let mut archive = ZipArchive::new(file)?;
        let mut entries = Vec::new();

        for i in 0..archive.len() {
            let mut member = archive.by_index(i)?;
            let name = member.name().to_string();
            if !name.ends_with(".class") || name.starts_with("META-INF") {
                continue;
            }

            let mut bytes = Vec::with_capacity(member.size() as usize);
            member.read_to_end(&mut bytes)?;

            match parse_class_member(&bytes, &name, &rules) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(
                        container = %container.path.display(),
                        member = %name,
                        "skipping unreadable class member: {err}"
                    );
                }
            }
        }

        Ok(entries)
    }
}

impl ContainerReader for JarContainerReader {
    fn can_read(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        ext == "jar" || ext == "zip"
    }

    fn read_container(&self, container: &ContainerRef) -> Result<Vec<TypeEntry>, BoxError> {
        self.read_entries(container).map_err(Into::into)
    }
}

fn parse_class_member(
    bytes: &[u8],
    member_path: &str,
    rules: &[(Regex, Accessibility)],
) -> Result<Option<TypeEntry>, JavaReadError> {
    let class = ClassFile::from_bytes(&mut Cursor::new(bytes.to_vec())).map_err(|e| {
        JavaReadError::ClassFile {
            member: member_path.to_string(),
            detail: format!("{e:?}"),
        }
    })?;

    let binary_name = class.class_name().map_err(|e| JavaReadError::ClassFile {
        member: member_path.to_string(),
        detail: format!("{e:?}"),
    })?;

    if class.access_flags.contains(ClassAccessFlags::SYNTHETIC) {
        return Ok(None);
    }

    let Some((package, segments)) = split_binary_name(binary_name) else {
        return Ok(None);
    };

    let kind = if class.access_flags.contains(ClassAccessFlags::ANNOTATION) {
        TypeKind::Annotation
    } else if class.access_flags.contains(ClassAccessFlags::INTERFACE) {
        TypeKind::Interface
    } else if class.access_flags.contains(ClassAccessFlags::ENUM) {
        TypeKind::Enum
    } else {
        TypeKind::Class
    };

    let mut super_types = Vec::new();
    if class.super_class != 0 {
        let name = class
            .constant_pool
            .try_get_class(class.super_class)
            .map_err(|e| JavaReadError::ClassFile {
                member: member_path.to_string(),
                detail: format!("{e:?}"),
            })?;
        super_types.push(to_dotted(name));
    }
    for idx in &class.interfaces {
        let name = class
            .constant_pool
            .try_get_class(*idx)
            .map_err(|e| JavaReadError::ClassFile {
                member: member_path.to_string(),
                detail: format!("{e:?}"),
            })?;
        super_types.push(to_dotted(name));
    }

    let Some((simple_name, enclosing)) = segments.split_last() else {
        return Ok(None);
    };

    let mut entry = TypeEntry {
        simple_name: simple_name.clone(),
        package,
        enclosing: enclosing.to_vec(),
        kind,
        modifiers: class.access_flags.bits(),
        accessibility: Accessibility::Accessible,
        super_types,
        member_path: member_path.to_string(),
    };
    entry.accessibility = accessibility_for(&entry.fqn(), rules);

    Ok(Some(entry))
}

/// Split an internal binary name into (dotted package, `$`-nesting
/// segments). Returns `None` for members that do not declare an indexable
/// type: `module-info`, `package-info`, and local/anonymous classes whose
/// nesting segment starts with a digit.
fn split_binary_name(binary_name: &str) -> Option<(String, Vec<String>)> {
    let (package, tail) = match binary_name.rfind('/') {
        Some(idx) => (binary_name[..idx].replace('/', "."), &binary_name[idx + 1..]),
        None => (String::new(), binary_name),
    };

    if tail == "module-info" || tail == "package-info" {
        return None;
    }

    let segments: Vec<String> = tail.split('$').map(str::to_string).collect();
    let declared = segments
        .iter()
        .all(|s| !s.is_empty() && !s.starts_with(|c: char| c.is_ascii_digit()));
    if !declared {
        return None;
    }

    Some((package, segments))
}

fn to_dotted(internal: &str) -> String {
    internal.replace('/', ".").replace('$', ".")
}

fn compile_access_rules(rules: &[AccessRule]) -> Vec<(Regex, Accessibility)> {
    rules
        .iter()
        .filter_map(|rule| match Regex::new(&wildcard_regex(&rule.pattern)) {
            Ok(regex) => Some((regex, rule.kind)),
            Err(err) => {
                tracing::debug!(pattern = %rule.pattern, "ignoring unparsable access rule: {err}");
                None
            }
        })
        .collect()
}

fn accessibility_for(fqn: &str, rules: &[(Regex, Accessibility)]) -> Accessibility {
    for (regex, kind) in rules {
        if regex.is_match(fqn) {
            return *kind;
        }
    }
    Accessibility::Accessible
}
