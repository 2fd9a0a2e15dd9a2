use anyhow::Context;
use groupauthz_core::group_store::{decode_group_field, split_group_list};
use groupauthz_core::store::GroupDatabase;
use groupauthz_core::{GroupEntry, KeyEncoding, StoreRegistry};
use owo_colors::OwoColorize;
use tabled::{
    builder::Builder,
    settings::{object::Columns, Style, Width},
};

use crate::cli::{DbFileCommand, DbSetCommand, DbUserCommand};

fn key_encoding(cmd: &DbFileCommand) -> anyhow::Result<KeyEncoding> {
    let backend = StoreRegistry::with_defaults().resolve(&cmd.dbm_type)?;
    Ok(backend.key_encoding())
}

fn open(cmd: &DbFileCommand) -> anyhow::Result<GroupDatabase> {
    GroupDatabase::open(&cmd.file, key_encoding(cmd)?)
        .with_context(|| format!("Failed to open group file {}", cmd.file.display()))
}

pub fn create(cmd: &DbFileCommand) -> anyhow::Result<()> {
    GroupDatabase::create(&cmd.file, key_encoding(cmd)?)
        .with_context(|| format!("Failed to create group file {}", cmd.file.display()))?;
    println!("Created group file {}", cmd.file.display().yellow());
    Ok(())
}

pub fn set(cmd: &DbSetCommand) -> anyhow::Result<()> {
    let db = open(&cmd.db)?;

    let mut entry = GroupEntry::new(cmd.groups.iter().map(|g| g.trim()));
    if let Some(hash) = &cmd.password_hash {
        entry = entry.with_password_hash(hash);
    }
    if let Some(comment) = &cmd.comment {
        entry = entry.with_comment(comment);
    }

    let value = entry
        .encode()
        .with_context(|| format!("Refusing to store user {}", cmd.user))?;
    db.set(&cmd.user, &value)
        .with_context(|| format!("Failed to store user {}", cmd.user))?;
    println!(
        "Stored {} with groups {}",
        cmd.user.yellow(),
        entry.groups.join(", ").green()
    );
    Ok(())
}

pub fn get(cmd: &DbUserCommand) -> anyhow::Result<()> {
    let db = open(&cmd.db)?;
    let file = cmd.db.file.display();
    match db.get(&cmd.user)? {
        Some(value) => {
            let groups: Vec<&str> = split_group_list(decode_group_field(&value)).collect();
            println!("{}: {}", cmd.user.yellow(), groups.join(", "));
            Ok(())
        }
        None => anyhow::bail!("User {} not found in {}", cmd.user, file),
    }
}

pub fn remove(cmd: &DbUserCommand) -> anyhow::Result<()> {
    let db = open(&cmd.db)?;
    if !db.remove(&cmd.user)? {
        let file = cmd.db.file.display();
        anyhow::bail!("User {} not found in {}", cmd.user, file);
    }
    println!("Removed {}", cmd.user.yellow());
    Ok(())
}

pub fn list(cmd: &DbFileCommand) -> anyhow::Result<()> {
    let db = open(cmd)?;

    let mut builder = Builder::default();
    builder.push_record(vec!["User", "Groups", "Password"]);
    for (user, value) in db.list()? {
        let groups = split_group_list(decode_group_field(&value))
            .collect::<Vec<_>>()
            .join(", ");
        let has_password = value.split_once(':').is_some_and(|(pw, _)| !pw.is_empty());
        builder.push_record(vec![
            user,
            groups,
            if has_password { "yes" } else { "no" }.to_string(),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.modify(Columns::one(1), Width::wrap(50).keep_words(true));
    println!("{table}");
    Ok(())
}
