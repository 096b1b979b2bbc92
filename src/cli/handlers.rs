// FILE: src/cli/handlers.rs
use crate::{
    build_context, check_source, cli::OutputFormat, context_builder::BuildOptions, load_bundle, render_page,
    PageBundle, RenderStats, Result, SlotError,
};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::Path;
use std::sync::mpsc::channel;

// --- RENDER ---
pub fn handle_render_command(cli: &super::SlotCli, matches: &clap::ArgMatches) -> Result<()> {
    let template_path = required(matches, "template")?;
    let data_path = required(matches, "data")?;
    let output_path = matches.get_one::<String>("output").map(String::as_str);
    let options = cli.build_options(matches);
    let locale_override = matches.get_one::<String>("locale").cloned();

    let load = || -> Result<PageBundle> {
        let mut bundle = load_bundle(data_path)?;
        cli.config().apply_to_bundle(&mut bundle)?;
        if let Some(locale) = &locale_override {
            bundle.locale = Some(locale.clone());
        }
        Ok(bundle)
    };

    if matches.get_flag("watch") {
        watch_and_render(template_path, data_path, output_path, &options, load)
    } else {
        let stats = render_once(template_path, &load()?, &options, output_path)?;
        if matches.get_flag("stats") {
            print_stats(&stats)?;
        }
        Ok(())
    }
}

fn required<'a>(matches: &'a clap::ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| SlotError::invalid_format(format!("Missing required argument '{}'", name)))
}

pub(crate) fn render_once(
    template_path: &str,
    bundle: &PageBundle,
    options: &BuildOptions,
    output_path: Option<&str>,
) -> Result<RenderStats> {
    let template = fs::read_to_string(template_path).map_err(|e| SlotError::FileNotFound {
        path: format!("{}: {}", template_path, e),
    })?;

    let output = render_page(&template, bundle, options);
    match output_path {
        Some(path) => {
            fs::write(path, &output.html)?;
            log::info!("Wrote {} bytes to {}", output.stats.output_size, path);
        }
        None => println!("{}", output.html),
    }
    Ok(output.stats)
}

fn watch_and_render<F>(
    template_path: &str,
    data_path: &str,
    output_path: Option<&str>,
    options: &BuildOptions,
    load: F,
) -> Result<()>
where
    F: Fn() -> Result<PageBundle>,
{
    eprintln!("Watching {} and {} for changes...", template_path, data_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if let Err(e) = tx.send(event) {
                    eprintln!("Watch error: {}", e);
                }
            }
        },
        notify::Config::default(),
    )
    .map_err(|e| watch_error("Failed to create file watcher", e))?;

    for path in [template_path, data_path] {
        watcher
            .watch(Path::new(path), RecursiveMode::NonRecursive)
            .map_err(|e| watch_error("Failed to watch file", e))?;
    }

    let rerender = || match load().and_then(|bundle| render_once(template_path, &bundle, options, output_path)) {
        Ok(stats) => eprintln!("Rendered {} bytes", stats.output_size),
        Err(e) => eprintln!("Render failed: {}", e),
    };

    rerender();
    loop {
        match rx.recv() {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                log::debug!("Change detected: {:?}", event.paths);
                rerender();
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Watch error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

fn watch_error(context: &str, e: notify::Error) -> SlotError {
    SlotError::Io(std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e)))
}

fn print_stats(stats: &RenderStats) -> Result<()> {
    eprintln!("Render statistics:");
    eprintln!("   Template: {} bytes", stats.template_size);
    eprintln!("   Output: {} bytes", stats.output_size);
    eprintln!("   Variables: {}", stats.variable_count);
    eprintln!("   Unmatched directives: {}", stats.diagnostic_count);
    eprintln!("   Time: {}ms", stats.render_time_ms);
    Ok(())
}

// --- CONTEXT ---
pub fn handle_context_command(cli: &super::SlotCli, matches: &clap::ArgMatches) -> Result<()> {
    let data_path = required(matches, "data")?;
    let options = cli.build_options(matches);

    let mut bundle = load_bundle(data_path)?;
    cli.config().apply_to_bundle(&mut bundle)?;
    if let Some(locale) = matches.get_one::<String>("locale") {
        bundle.locale = Some(locale.clone());
    }

    let format = matches.get_one::<OutputFormat>("format").cloned().unwrap_or(OutputFormat::Pretty);
    println!("{}", context_json(&bundle, &options, &format)?);
    Ok(())
}

pub(crate) fn context_json(bundle: &PageBundle, options: &BuildOptions, format: &OutputFormat) -> Result<String> {
    let context = build_context(bundle, options).to_value();
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&context)?,
        OutputFormat::Pretty => serde_json::to_string_pretty(&context)?,
    })
}

// --- CHECK ---
pub fn handle_check_command(cli: &super::SlotCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required(matches, "input")?;
    let recursive = matches.get_flag("recursive");

    if Path::new(input_path).is_dir() {
        let extensions = cli.config().template_extensions();
        check_directory(input_path, recursive, &extensions)
    } else {
        check_single_file(input_path)
    }
}

pub(crate) fn check_single_file(input_path: &str) -> Result<()> {
    let source = fs::read_to_string(input_path).map_err(|e| SlotError::FileNotFound {
        path: format!("{}: {}", input_path, e),
    })?;

    match check_source(&source, input_path) {
        Ok(_) => {
            println!("✅ {} - No issues found", input_path);
            Ok(())
        }
        Err(e) => {
            // Report every diagnostic, fail with the first
            for diagnostic in crate::Template::parse(&source).diagnostics {
                println!("❌ {}:{} - {}", input_path, diagnostic.line, diagnostic.message);
            }
            Err(e)
        }
    }
}

pub(crate) fn check_directory(dir_path: &str, recursive: bool, extensions: &[String]) -> Result<()> {
    let mut total_files = 0;
    let mut error_files = 0;

    let walker = walkdir::WalkDir::new(dir_path).max_depth(if recursive { usize::MAX } else { 1 });
    for entry in walker {
        let entry = entry.map_err(|e| {
            SlotError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches_extension = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if matches_extension {
            total_files += 1;
            if check_single_file(&entry.path().to_string_lossy()).is_err() {
                error_files += 1;
            }
        }
    }

    println!("\n📊 Check Summary:");
    println!("   Total files: {}", total_files);
    println!("   Files with errors: {}", error_files);

    if error_files > 0 {
        Err(SlotError::template(
            dir_path,
            0,
            format!("{} files have unmatched directives", error_files),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn bundle() -> PageBundle {
        serde_json::from_value(json!({
            "page_type": "cart",
            "store": { "slug": "acme", "name": "Acme" },
            "data": { "cartItems": [{ "quantity": 2, "price": 4, "product": { "name": "Tea" } }] }
        }))
        .unwrap()
    }

    #[test]
    fn test_render_once_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let template_path = temp_dir.path().join("cart.hbs");
        let output_path = temp_dir.path().join("cart.html");
        fs::write(
            &template_path,
            "{{#each cart_items}}{{name}} x{{quantity}} = {{line_total_formatted}}{{/each}} | {{cart.total_formatted}}",
        )
        .unwrap();

        let stats = render_once(
            template_path.to_str().unwrap(),
            &bundle(),
            &BuildOptions::default(),
            Some(output_path.to_str().unwrap()),
        )
        .unwrap();

        let html = fs::read_to_string(&output_path).unwrap();
        assert_eq!(html, "Tea x2 = $8.00 | $8.00");
        assert_eq!(stats.output_size, html.len());
    }

    #[test]
    fn test_context_json() {
        let json = context_json(&bundle(), &BuildOptions::default(), &OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cart"]["item_count"], json!(2));
        assert_eq!(value["page_type"], json!("cart"));
    }

    #[test]
    fn test_check_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(temp_dir.path().join("good.hbs"), "{{#if a}}ok{{/if}}").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "{{#if a}}").unwrap();
        fs::write(nested.join("bad.hbs"), "{{#each items}}").unwrap();

        let extensions = vec!["hbs".to_string()];
        let root = temp_dir.path().to_str().unwrap();
        assert!(check_directory(root, false, &extensions).is_ok());
        assert!(matches!(
            check_directory(root, true, &extensions),
            Err(SlotError::Template { .. })
        ));
    }

    #[test]
    fn test_check_single_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("slot.hbs");
        fs::write(&path, "{{/if}}").unwrap();
        assert!(check_single_file(path.to_str().unwrap()).is_err());
        assert!(matches!(check_single_file("/nonexistent.hbs"), Err(SlotError::FileNotFound { .. })));
    }
}
