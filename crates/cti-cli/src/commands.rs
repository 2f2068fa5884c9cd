use std::path::Path;

use anyhow::{anyhow, Context};
use colored::Colorize;
use cti_objects::{DescriptionProperty, HasProperty, NameProperty, Object};
use cti_store::{
    collection_objects, Collection, CollectionStore, NewCollection, ObjectVersionStore,
    SqliteDatastore, StoreConfig, Table,
};
use cti_types::{CollectionId, StixId, Timestamp};
use serde::Serialize;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let store = SqliteDatastore::open(&config)
        .with_context(|| format!("opening {}", config.database.display()))?;
    store.create_schema()?;

    let format = cli.format;
    match cli.command {
        Command::Init => cmd_init(&store, &config),
        Command::Collection(args) => cmd_collection(&store, format, args.action),
        Command::Content(args) => cmd_content(&store, format, args.action),
        Command::Object(args) => cmd_object(&store, format, args.action),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    debug!(database = %config.database.display(), "resolved store configuration");
    Ok(config)
}

fn cmd_init(store: &SqliteDatastore, config: &StoreConfig) -> anyhow::Result<()> {
    println!(
        "{} Initialized CTI Vault in {}",
        "✓".green().bold(),
        config.database.display().to_string().bold()
    );
    for table in Table::ALL {
        println!("  Table: {}", store.schema().name(table).cyan());
    }
    println!("  Media types: {:?}", config.media_type_policy);
    Ok(())
}

// ----------------------------------------------------------------
// Collections
// ----------------------------------------------------------------

fn cmd_collection<S: CollectionStore>(
    store: &S,
    format: OutputFormat,
    action: CollectionAction,
) -> anyhow::Result<()> {
    match action {
        CollectionAction::Create { title, description, id, read, write } => {
            let mut new = NewCollection::new(title).readable(read).writable(write);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            if let Some(id) = id {
                new = new.with_id(parse_collection_id(&id)?);
            }
            let id = store.register_collection(new)?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({ "id": id })),
                OutputFormat::Text => {
                    println!("{} Registered collection {}", "✓".green().bold(), id.to_string().yellow());
                    Ok(())
                }
            }
        }
        CollectionAction::List => {
            let collections = store.list_collections()?;
            match format {
                OutputFormat::Json => print_json(&collections),
                OutputFormat::Text if collections.is_empty() => {
                    println!("No collections.");
                    Ok(())
                }
                OutputFormat::Text => {
                    for collection in &collections {
                        print_collection_line(collection);
                    }
                    Ok(())
                }
            }
        }
        CollectionAction::Show { id } => {
            let id = parse_collection_id(&id)?;
            let collection = store
                .collection(&id)?
                .ok_or_else(|| anyhow!("collection not found: {id}"))?;
            let media_types = store.accepted_media_types(&id)?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "collection": collection,
                    "media_types": media_types,
                })),
                OutputFormat::Text => {
                    print_collection_line(&collection);
                    if let Some(description) = &collection.description {
                        println!("  {description}");
                    }
                    println!("  Added: {}", collection.date_added);
                    for media_type in &media_types {
                        println!("  Accepts: {}", media_type.blue());
                    }
                    Ok(())
                }
            }
        }
        CollectionAction::Enable { id } => set_enabled(store, &id, true),
        CollectionAction::Disable { id } => set_enabled(store, &id, false),
        CollectionAction::MediaTypes { id, media_types } => {
            let id = parse_collection_id(&id)?;
            if !media_types.is_empty() {
                store.set_accepted_media_types(&id, &media_types)?;
            } else if store.collection(&id)?.is_none() {
                return Err(anyhow!("collection not found: {id}"));
            }
            let stored = store.accepted_media_types(&id)?;
            match format {
                OutputFormat::Json => print_json(&stored),
                OutputFormat::Text => {
                    for media_type in &stored {
                        println!("{}", media_type.blue());
                    }
                    Ok(())
                }
            }
        }
    }
}

fn set_enabled<S: CollectionStore>(store: &S, id: &str, enabled: bool) -> anyhow::Result<()> {
    let id = parse_collection_id(id)?;
    store.set_enabled(&id, enabled)?;
    let state = if enabled { "enabled".green() } else { "disabled".red() };
    println!("Collection {} {}", id.to_string().yellow(), state);
    Ok(())
}

fn print_collection_line(collection: &Collection) {
    let state = if collection.enabled {
        "enabled".green()
    } else {
        "disabled".red()
    };
    let mut access = Vec::new();
    if collection.can_read {
        access.push("read");
    }
    if collection.can_write {
        access.push("write");
    }
    println!(
        "{}  {}  [{}] ({})",
        collection.id.to_string().yellow(),
        collection.title.bold(),
        access.join(",").cyan(),
        state
    );
}

// ----------------------------------------------------------------
// Content
// ----------------------------------------------------------------

fn cmd_content<S: CollectionStore + ObjectVersionStore>(
    store: &S,
    format: OutputFormat,
    action: ContentAction,
) -> anyhow::Result<()> {
    match action {
        ContentAction::Add { collection, stix_id, date_added } => {
            let collection = parse_collection_id(&collection)?;
            let stix_id = parse_stix_id(&stix_id)?;
            let date_added = match date_added {
                Some(text) => parse_timestamp(&text)?,
                None => Timestamp::now(),
            };
            store.add_to_collection(&collection, &stix_id, date_added)?;
            println!("  {} {}", "added:".green(), stix_id);
            Ok(())
        }
        ContentAction::List { collection, added_after, objects } => {
            let collection = parse_collection_id(&collection)?;
            let ids = match &added_after {
                Some(text) => store.content_added_after(&collection, parse_timestamp(text)?)?,
                None => store.list_content(&collection)?,
            };

            if objects {
                let resolved = match added_after {
                    None => collection_objects(store, &collection)?,
                    Some(_) => {
                        let mut resolved = Vec::new();
                        for id in &ids {
                            resolved.extend(store.latest_version(id)?);
                        }
                        resolved
                    }
                };
                return print_objects(&resolved, format);
            }

            match format {
                OutputFormat::Json => print_json(&ids),
                OutputFormat::Text => {
                    for id in &ids {
                        println!("{id}");
                    }
                    Ok(())
                }
            }
        }
    }
}

// ----------------------------------------------------------------
// Objects
// ----------------------------------------------------------------

fn cmd_object<S: CollectionStore + ObjectVersionStore>(
    store: &S,
    format: OutputFormat,
    action: ObjectAction,
) -> anyhow::Result<()> {
    match action {
        ObjectAction::New { object_type, edits, collection } => {
            let mut object = Object::new(&object_type)?;
            apply_edits(&mut object, &edits);
            store_object(store, &object, collection.as_deref())?;
            print_stored(&object, format)
        }
        ObjectAction::Version { id, edits, revoke, collection } => {
            let id = parse_stix_id(&id)?;
            let latest = store
                .latest_version(&id)?
                .ok_or_else(|| anyhow!("no stored version of {id}"))?;
            let mut next = if revoke { latest.revoke() } else { latest.new_version() };
            apply_edits(&mut next, &edits);
            store_object(store, &next, collection.as_deref())?;
            print_stored(&next, format)
        }
        ObjectAction::Import { file, collection } => {
            let object = read_object(&file)?;
            store_object(store, &object, collection.as_deref())?;
            print_stored(&object, format)
        }
        ObjectAction::Show { id, modified } => {
            let id = parse_stix_id(&id)?;
            let object = match modified {
                Some(text) => store.get_version(&id, parse_timestamp(&text)?)?,
                None => store.latest_version(&id)?,
            }
            .ok_or_else(|| anyhow!("no stored version of {id}"))?;
            match format {
                OutputFormat::Json => print_json(&object),
                OutputFormat::Text => {
                    print_object_line(&object);
                    println!("{}", serde_json::to_string_pretty(&object)?);
                    Ok(())
                }
            }
        }
        ObjectAction::History { id } => {
            let id = parse_stix_id(&id)?;
            print_objects(&store.versions(&id)?, format)
        }
    }
}

fn store_object<S: CollectionStore + ObjectVersionStore>(
    store: &S,
    object: &Object,
    collection: Option<&str>,
) -> anyhow::Result<()> {
    let collection = collection.map(parse_collection_id).transpose()?;
    store.put_version(object)?;
    if let Some(collection) = collection {
        store.add_to_collection(&collection, object.id(), Timestamp::now())?;
    }
    Ok(())
}

fn read_object(path: &Path) -> anyhow::Result<Object> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Object::from_canonical_form(&bytes).with_context(|| format!("decoding {}", path.display()))
}

fn apply_edits(object: &mut Object, edits: &ObjectEdits) {
    match object {
        Object::AttackPattern(o) => edit_text(o, edits),
        Object::Campaign(o) => edit_text(o, edits),
        Object::IntrusionSet(o) => edit_text(o, edits),
        Object::Malware(o) => edit_text(o, edits),
        Object::Tool(o) => edit_text(o, edits),
    }
    let common = object.common_mut();
    for label in &edits.labels {
        common.add_label(label.clone());
    }
    if edits.confidence.is_some() {
        common.set_confidence(edits.confidence);
    }
}

fn edit_text<T>(object: &mut T, edits: &ObjectEdits)
where
    T: HasProperty<NameProperty> + HasProperty<DescriptionProperty>,
{
    if let Some(name) = &edits.name {
        HasProperty::<NameProperty>::property_mut(object).set_name(name.clone());
    }
    if let Some(description) = &edits.description {
        HasProperty::<DescriptionProperty>::property_mut(object).set_description(description.clone());
    }
}

fn object_name(object: &Object) -> Option<&str> {
    match object {
        Object::AttackPattern(o) => o.name.name(),
        Object::Campaign(o) => o.name.name(),
        Object::IntrusionSet(o) => o.name.name(),
        Object::Malware(o) => o.name.name(),
        Object::Tool(o) => o.name.name(),
    }
}

fn print_object_line(object: &Object) {
    let revoked = if object.common().revoked() {
        " (revoked)".red().to_string()
    } else {
        String::new()
    };
    println!(
        "{}  {}  {}{}",
        object.id().to_string().yellow(),
        object.modified().to_string().dimmed(),
        object_name(object).unwrap_or("(unnamed)").bold(),
        revoked
    );
}

fn print_stored(object: &Object, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(object),
        OutputFormat::Text => {
            println!("{} Stored version", "✓".green().bold());
            print_object_line(object);
            Ok(())
        }
    }
}

fn print_objects(objects: &[Object], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&objects),
        OutputFormat::Text => {
            for object in objects {
                print_object_line(object);
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_collection_id(text: &str) -> anyhow::Result<CollectionId> {
    CollectionId::parse(text).with_context(|| format!("invalid collection id {text:?}"))
}

fn parse_stix_id(text: &str) -> anyhow::Result<StixId> {
    StixId::parse(text).with_context(|| format!("invalid STIX id {text:?}"))
}

fn parse_timestamp(text: &str) -> anyhow::Result<Timestamp> {
    Timestamp::parse(text).with_context(|| format!("invalid timestamp {text:?}"))
}
