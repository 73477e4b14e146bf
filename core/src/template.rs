use crate::types::SubstitutionPair;

pub const IN_FILE_PLACEHOLDER: &str = "_INFILE_";
pub const OUT_FILE_PLACEHOLDER: &str = "_OUTFILE_";
pub const IN_PATH_PLACEHOLDER: &str = "_INPATH_";
pub const OUT_PATH_PLACEHOLDER: &str = "_OUTPATH_";
pub const HOST_PLACEHOLDER: &str = "_HOST_";

#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub in_file: &'a str,
    pub out_file: &'a str,
    pub in_path: &'a str,
    pub out_path: &'a str,
    pub host: &'a str,
}

/// Renders a command template. Fixed placeholders go first, then each substitution in order,
/// so a later pair also rewrites text produced by an earlier one.
pub fn render(template: &str, context: &RenderContext<'_>, substitutions: &[SubstitutionPair]) -> String {
    let mut command = template
        .replace(IN_FILE_PLACEHOLDER, context.in_file)
        .replace(OUT_FILE_PLACEHOLDER, context.out_file)
        .replace(IN_PATH_PLACEHOLDER, context.in_path)
        .replace(OUT_PATH_PLACEHOLDER, context.out_path)
        .replace(HOST_PLACEHOLDER, context.host);

    for pair in substitutions {
        if pair.name.is_empty() {
            continue;
        }
        command = command.replace(&pair.name, &pair.value.to_string());
    }

    command
}

pub fn output_file_name(input: &str, replace_extension: bool, new_extension: &str) -> String {
    if !replace_extension {
        return input.to_string();
    }

    let extension = new_extension.trim_start_matches('.');
    let stem = match input.rfind('.') {
        Some(index) if index > 0 => &input[..index],
        _ => input,
    };

    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{extension}")
    }
}
