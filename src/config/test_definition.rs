use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::PathReportExt;
use crate::notifications::SettleConfig;
use crate::operators::Operation;

const RANDOM_EXCLUDE_TOKEN: &str = "random";

type Mapping<'a> = LinkedHashMap<Yaml<'a>, Yaml<'a>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelDirectory {
    pub name: String,
    pub height: usize,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeEntry {
    Random,
    Path(PathBuf),
}

/// JSON definitions load through the YAML parser unchanged.
#[derive(Debug, Clone)]
pub struct TestDefinition {
    pub test_directory: PathBuf,
    pub top_level_directories: Vec<TopLevelDirectory>,
    pub exclude_directories: Vec<ExcludeEntry>,
    pub executable_path: PathBuf,
    pub verbose: bool,
    pub seed: Option<u64>,
    pub settle: SettleConfig,
    pub tests: Vec<Operation>,
}

impl TestDefinition {
    pub async fn read(path: &Path) -> Result<Self, DefinitionError> {
        debug!("Opening test definition: {}", path.report_display());
        let bytes = compio::fs::read(path).await.context(ReadSnafu {
            file_path: path.report_display(),
        })?;
        debug!("Successfully read test definition: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.report_display(),
        })?;
        contents.as_str().try_into()
    }

    fn parse_top_level_directory(entry: &Yaml<'_>) -> Result<TopLevelDirectory, DefinitionError> {
        let mapping = entry.as_mapping().context(WrongTypeSnafu {
            field: "top_level_directories[]",
            expected: "map",
        })?;
        let name = required_str(mapping, "name")?;
        // The control directory is watched as-is, no tree is generated in it.
        let (height, width) = if name == crate::filesystem::CONTROL_DIR_NAME {
            (0, 0)
        } else {
            (
                required_usize(mapping, "height")?,
                required_usize(mapping, "width")?,
            )
        };

        Ok(TopLevelDirectory {
            name,
            height,
            width,
        })
    }

    fn parse_exclude_entry(entry: &Yaml<'_>) -> Result<ExcludeEntry, DefinitionError> {
        match entry.as_str() {
            Some(RANDOM_EXCLUDE_TOKEN) => Ok(ExcludeEntry::Random),
            Some(path) => Ok(ExcludeEntry::Path(PathBuf::from(path))),
            None => WrongTypeSnafu {
                field: "exclude_directories[]",
                expected: "string",
            }
            .fail(),
        }
    }

    fn parse_settle(top_level: &Mapping<'_>) -> Result<SettleConfig, DefinitionError> {
        let mut settle = SettleConfig::default();
        let Some(node) = field(top_level, "settle") else {
            return Ok(settle);
        };
        let mapping = node.as_mapping().context(WrongTypeSnafu {
            field: "settle",
            expected: "map",
        })?;

        if let Some(ms) = optional_u64(mapping, "min_wait_ms")? {
            settle.min_wait = Duration::from_millis(ms);
        }
        if let Some(ms) = optional_u64(mapping, "quiet_period_ms")? {
            settle.quiet_period = Duration::from_millis(ms);
        }
        if let Some(ms) = optional_u64(mapping, "poll_interval_ms")? {
            settle.poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = optional_u64(mapping, "max_wait_ms")? {
            settle.max_wait = Duration::from_millis(ms);
        }
        Ok(settle)
    }

    fn parse_operation(entry: &Yaml<'_>) -> Result<Operation, DefinitionError> {
        let mapping = entry.as_mapping().context(WrongTypeSnafu {
            field: "tests[]",
            expected: "map",
        })?;
        let name = required_str(mapping, "name")?;
        debug!("Parsing test '{}'", name);

        let operation = match name.as_str() {
            "add_file" => Operation::AddFile,
            "delete_file" => Operation::DeleteFile,
            "move_file" => Operation::MoveFile,
            "add_directory" => Operation::AddDirectory,
            "delete_directory" => Operation::DeleteDirectory,
            "add_tree" => Operation::AddTree {
                tree_name: required_str(mapping, "tree_name")?,
                height: required_usize(mapping, "height")?,
                width: required_usize(mapping, "width")?,
            },
            "remove_tree" => Operation::RemoveTree {
                tree_name: required_str(mapping, "tree_name")?,
            },
            "move_tree" => Operation::MoveTree {
                tree_name: required_str(mapping, "tree_name")?,
            },
            _ => return UnknownOperationSnafu { name }.fail(),
        };
        Ok(operation)
    }

    fn parse_sequence<'a, T>(
        top_level: &Mapping<'a>,
        name: &'static str,
        parse: impl Fn(&Yaml<'a>) -> Result<T, DefinitionError>,
    ) -> Result<Vec<T>, DefinitionError> {
        field(top_level, name)
            .context(MissingFieldSnafu { field: name })?
            .as_sequence()
            .context(WrongTypeSnafu {
                field: name,
                expected: "list",
            })?
            .iter()
            .map(parse)
            .collect()
    }
}

impl TryFrom<&str> for TestDefinition {
    type Error = DefinitionError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let contents_vec = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let contents = contents_vec.first().context(MalformedDefinitionSnafu)?;
        let top_level = contents.as_mapping().context(TopLevelNotMapSnafu)?;

        let test_directory = PathBuf::from(required_str(top_level, "test_directory")?);
        let executable_path = PathBuf::from(required_str(top_level, "executable_path")?);
        let verbose = optional_bool(top_level, "verbose")?
            .context(MissingFieldSnafu { field: "verbose" })?;
        let top_level_directories = Self::parse_sequence(
            top_level,
            "top_level_directories",
            Self::parse_top_level_directory,
        )?;
        let exclude_directories =
            Self::parse_sequence(top_level, "exclude_directories", Self::parse_exclude_entry)?;
        let tests = Self::parse_sequence(top_level, "tests", Self::parse_operation)?;

        let definition = TestDefinition {
            test_directory,
            top_level_directories,
            exclude_directories,
            executable_path,
            verbose,
            seed: optional_u64(top_level, "seed")?,
            settle: Self::parse_settle(top_level)?,
            tests,
        };
        debug!("Loaded test definition: {:?}", definition);
        Ok(definition)
    }
}

fn field<'a, 'b>(mapping: &'b Mapping<'a>, name: &'a str) -> Option<&'b Yaml<'a>> {
    mapping
        .get(&Yaml::Value(Scalar::String(Cow::Borrowed(name))))
        .filter(|node| !matches!(node, Yaml::Value(Scalar::Null)))
}

fn required_str(mapping: &Mapping<'_>, name: &'static str) -> Result<String, DefinitionError> {
    field(mapping, name)
        .context(MissingFieldSnafu { field: name })?
        .as_str()
        .map(str::to_string)
        .context(WrongTypeSnafu {
            field: name,
            expected: "string",
        })
}

fn optional_u64(mapping: &Mapping<'_>, name: &'static str) -> Result<Option<u64>, DefinitionError> {
    match field(mapping, name) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::Integer(n))) if *n >= 0 => Ok(Some(*n as u64)),
        Some(_) => WrongTypeSnafu {
            field: name,
            expected: "non-negative integer",
        }
        .fail(),
    }
}

fn required_usize(mapping: &Mapping<'_>, name: &'static str) -> Result<usize, DefinitionError> {
    optional_u64(mapping, name)?
        .map(|n| n as usize)
        .context(MissingFieldSnafu { field: name })
}

fn optional_bool(
    mapping: &Mapping<'_>,
    name: &'static str,
) -> Result<Option<bool>, DefinitionError> {
    match field(mapping, name) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::Boolean(b))) => Ok(Some(*b)),
        Some(_) => WrongTypeSnafu {
            field: name,
            expected: "boolean",
        }
        .fail(),
    }
}

#[derive(Debug, Snafu)]
pub enum DefinitionError {
    #[snafu(display("Failed to read the test definition: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Test definition {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the test definition"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted test definition"))]
    MalformedDefinition,
    #[snafu(display("Top level of the test definition should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Required field '{}' is missing", field))]
    MissingField { field: &'static str },
    #[snafu(display("Field '{}' should be a {}", field, expected))]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    #[snafu(display("Unknown test '{}'", name))]
    UnknownOperation { name: String },
}
