//! Resolution of the assets that resource files refer to in their own content.
//!
//! | Resource          | Reference                     | Relative to                          |
//! |-------------------|-------------------------------|--------------------------------------|
//! | Particle (plist)  | `textureFileName`             | particle file                        |
//! | Tile map (tmx)    | `tileset@source`              | map file                             |
//! | Tile map (tmx)    | `tileset/image@source`        | map file                             |
//! | Tileset (tsx)     | `image@source`                | external tileset file                |
//! | Bitmap font (fnt) | `file` of the `page` line     | font file                            |
//!
//! Resolving references never fails. A file that can't be parsed has no references and the problem
//! is reported as a [`Warning`].

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use cocoport_shared::{log::trace, normalize_path, once_cell::sync::Lazy};
use regex::Regex;
use serde::Deserialize;

use crate::{
    common::{parent_dir, parse_xml},
    Warning,
};

static FNT_PAGE_EXP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^[ \t]*page[ \t][^\r\n]*").expect("invalid page expression"));
static FNT_ITEM_EXP: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(\w+)=("[^"]*"|[^ \t\r\n]+)"#).expect("invalid item expression"));
static FNT_INT_EXP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("invalid integer expression"));

/// Resource formats that refer to other files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Particle,
    TileMap,
    BitmapFont,
}

/// Absolute paths of the files a resource refers to in the order they are declared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvedReferences {
    pub paths: Vec<PathBuf>,
    pub warnings: Vec<Warning>,
}

impl ResolvedReferences {
    fn warn(&mut self, file: &Path, reason: impl Into<String>) {
        self.warnings.push(Warning::ReferenceResolution {
            file: file.to_owned(),
            reason: reason.into(),
        });
    }
}

/// Returns the files that the resource `file` refers to.
pub fn resolve_references(kind: ReferenceKind, file: &Path) -> ResolvedReferences {
    let mut resolved = ResolvedReferences::default();
    let content = match fs::read(file) {
        Ok(content) => content,
        Err(err) => {
            resolved.warn(file, err.to_string());
            return resolved;
        }
    };

    match kind {
        ReferenceKind::Particle => match parse_particle_texture(&content) {
            Ok(texture) => resolved.paths.push(resolve_relative_to(file, &texture)),
            Err(reason) => resolved.warn(file, reason),
        },
        ReferenceKind::TileMap => {
            if let Some(content) = as_text(file, &content, &mut resolved) {
                resolve_tile_map(file, content, &mut resolved);
            }
        }
        ReferenceKind::BitmapFont => {
            if let Some(content) = as_text(file, &content, &mut resolved) {
                match parse_fnt_page(content) {
                    Ok(page) => match page.get("file") {
                        Some(FntValue::Text(image)) if !image.is_empty() => resolved.paths.push(resolve_relative_to(file, image)),
                        Some(FntValue::Integer(image)) => resolved.paths.push(resolve_relative_to(file, &image.to_string())),
                        _ => resolved.warn(file, "the page line doesn't declare an image file"),
                    },
                    Err(reason) => resolved.warn(file, reason),
                }
            }
        }
    }

    for path in &resolved.paths {
        trace!("{file:?} refers to {path:?}");
    }
    resolved
}

fn as_text<'c>(file: &Path, content: &'c [u8], resolved: &mut ResolvedReferences) -> Option<&'c str> {
    match std::str::from_utf8(content) {
        Ok(content) => Some(content),
        Err(err) => {
            resolved.warn(file, format!("file is not valid UTF-8: {err}"));
            None
        }
    }
}

fn resolve_relative_to(file: &Path, reference: &str) -> PathBuf {
    normalize_path(parent_dir(file).join(reference))
}

#[derive(Debug, Deserialize)]
struct ParticleConfig {
    #[serde(rename = "textureFileName", default)]
    texture_file_name: Option<plist::Value>,
}

/// Returns the texture that the particle configuration refers to. The configuration is either an XML
/// or a binary property list.
pub fn parse_particle_texture(content: &[u8]) -> Result<String, String> {
    let config: ParticleConfig = plist::from_bytes(content).map_err(|err| format!("failed to parse particle file: {err}"))?;
    match config.texture_file_name {
        Some(plist::Value::String(texture)) if !texture.trim().is_empty() => Ok(texture),
        Some(_) => Err("invalid textureFileName".to_owned()),
        None => Err("no textureFileName found".to_owned()),
    }
}

/// A `tileset` element of a tile map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilesetReference {
    /// The external tileset file.
    pub source: Option<String>,
    /// Images declared inside of the `tileset` element.
    pub images: Vec<String>,
}

/// Returns the tilesets declared in a tile map file.
pub fn parse_tilesets(content: &str) -> Result<Vec<TilesetReference>, String> {
    let document = parse_xml(content).map_err(|err| format!("failed to parse tile map: {err}"))?;
    let tilesets = document
        .descendants()
        .filter(|node| node.has_tag_name("tileset"))
        .map(|tileset| TilesetReference {
            source: tileset.attribute("source").filter(|source| !source.is_empty()).map(ToOwned::to_owned),
            images: image_sources(tileset),
        })
        .collect();
    Ok(tilesets)
}

/// Returns the images declared in an external tileset file.
pub fn parse_tileset_images(content: &str) -> Result<Vec<String>, String> {
    let document = parse_xml(content).map_err(|err| format!("failed to parse tileset: {err}"))?;
    Ok(image_sources(document.root()))
}

fn image_sources(node: roxmltree::Node) -> Vec<String> {
    node.descendants()
        .filter(|node| node.has_tag_name("image"))
        .filter_map(|image| image.attribute("source"))
        .filter(|source| !source.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn resolve_tile_map(map_file: &Path, content: &str, resolved: &mut ResolvedReferences) {
    let tilesets = match parse_tilesets(content) {
        Ok(tilesets) => tilesets,
        Err(reason) => {
            resolved.warn(map_file, reason);
            return;
        }
    };

    for tileset in tilesets {
        if let Some(source) = &tileset.source {
            // Images of an external tileset are relative to the tileset file and not to the map.
            let tileset_file = resolve_relative_to(map_file, source);
            resolved.paths.push(tileset_file.clone());
            if tileset_file.exists() {
                match fs::read_to_string(&tileset_file)
                    .map_err(|err| err.to_string())
                    .and_then(|content| parse_tileset_images(&content))
                {
                    Ok(images) => resolved
                        .paths
                        .extend(images.iter().map(|image| resolve_relative_to(&tileset_file, image))),
                    Err(reason) => resolved.warn(&tileset_file, reason),
                }
            }
        }
        resolved
            .paths
            .extend(tileset.images.iter().map(|image| resolve_relative_to(map_file, image)));
    }
}

/// Value of a `key=value` pair in a bitmap font file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FntValue {
    Integer(i64),
    Text(String),
}

/// Parses the first `page` line of a bitmap font file into its `key=value` pairs.
///
/// # Example
///
/// ```rust
/// use cocoport_import::{parse_fnt_page, FntValue};
/// let page = parse_fnt_page("info face=\"Arial\"\npage id=0 file=\"font_0.png\"").unwrap();
/// assert_eq!(page["id"], FntValue::Integer(0));
/// assert_eq!(page["file"], FntValue::Text("font_0.png".to_owned()));
/// ```
pub fn parse_fnt_page(content: &str) -> Result<BTreeMap<String, FntValue>, String> {
    let page_line = FNT_PAGE_EXP
        .find(content)
        .ok_or_else(|| "no page line found".to_owned())?
        .as_str();

    let mut page = BTreeMap::new();
    for captures in FNT_ITEM_EXP.captures_iter(page_line) {
        let key = captures[1].to_owned();
        let raw_value = &captures[2];
        let value = if FNT_INT_EXP.is_match(raw_value) {
            raw_value
                .parse()
                .map(FntValue::Integer)
                .unwrap_or_else(|_| FntValue::Text(raw_value.to_owned()))
        } else if let Some(quoted) = raw_value.strip_prefix('"') {
            FntValue::Text(quoted.strip_suffix('"').unwrap_or(quoted).to_owned())
        } else {
            FntValue::Text(raw_value.to_owned())
        };
        page.insert(key, value);
    }

    if page.is_empty() {
        return Err("no key=value pairs found in the page line".to_owned());
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use cocoport_shared::indoc::indoc;
    use cocoport_test::{setup_logger, write_file};
    use tempdir::TempDir;

    use super::*;

    const PARTICLE: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
        <plist version="1.0">
        <dict>
            <key>maxParticles</key>
            <integer>200</integer>
            <key>duration</key>
            <real>-1</real>
            <key>textureFileName</key>
            <string>fire.png</string>
        </dict>
        </plist>
    "#};

    #[test]
    fn fnt_page() {
        let page = parse_fnt_page("page id=0 file=\"font_0.png\"").unwrap();
        assert_eq!(page.get("id"), Some(&FntValue::Integer(0)));
        assert_eq!(page.get("file"), Some(&FntValue::Text("font_0.png".to_owned())));
    }

    #[test]
    fn fnt_page_is_first_page_line() {
        let content = indoc! {r#"
            info face="Arial Black" size=32 bold=0 italic=0 padding=0,0,0,0 spacing=-1,1
            common lineHeight=32 base=26 scaleW=256 scaleH=256 pages=2 packed=0
            page id=0 file="images/score 0.png"
            page id=1 file="score_1.png"
            chars count=0
        "#};
        let page = parse_fnt_page(content).unwrap();
        assert_eq!(page.get("file"), Some(&FntValue::Text("images/score 0.png".to_owned())));
        assert_eq!(page.get("id"), Some(&FntValue::Integer(0)));
    }

    #[test]
    fn fnt_values() {
        let page = parse_fnt_page("page id=-3 file=plain.png spacing=1,1").unwrap();
        assert_eq!(page.get("id"), Some(&FntValue::Integer(-3)));
        assert_eq!(page.get("file"), Some(&FntValue::Text("plain.png".to_owned())));
        assert_eq!(page.get("spacing"), Some(&FntValue::Text("1,1".to_owned())));
    }

    #[test]
    fn fnt_without_page() {
        assert!(parse_fnt_page("info face=\"Arial\"\nchars count=0").is_err());
    }

    #[test]
    fn fnt_references() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let font = write_file(root.path(), "fonts/score.fnt", "page id=0 file=\"score_0.png\"\n");
        let resolved = resolve_references(ReferenceKind::BitmapFont, &font);
        assert_eq!(resolved.paths, vec![root.path().join("fonts/score_0.png")]);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn fnt_without_page_warns() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let font = write_file(root.path(), "score.fnt", "info face=\"Arial\"\n");
        let resolved = resolve_references(ReferenceKind::BitmapFont, &font);
        assert!(resolved.paths.is_empty());
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn fnt_without_file_warns() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let font = write_file(root.path(), "score.fnt", "page id=0\n");
        let resolved = resolve_references(ReferenceKind::BitmapFont, &font);
        assert!(resolved.paths.is_empty());
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn particle_texture() {
        assert_eq!(parse_particle_texture(PARTICLE.as_bytes()).unwrap(), "fire.png");
    }

    #[test]
    fn particle_without_texture() {
        let content = indoc! {r#"
            <?xml version="1.0" encoding="UTF-8"?>
            <plist version="1.0">
            <dict>
                <key>textureFileName</key>
                <string>  </string>
            </dict>
            </plist>
        "#};
        assert!(parse_particle_texture(content.as_bytes()).is_err());
        assert!(parse_particle_texture(b"garbage").is_err());
    }

    #[test]
    fn particle_references() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let particle = write_file(root.path(), "effects/fire.plist", PARTICLE);
        let resolved = resolve_references(ReferenceKind::Particle, &particle);
        assert_eq!(resolved.paths, vec![root.path().join("effects/fire.png")]);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn binary_particle_references() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let particle = root.path().join("fire.plist");
        let mut config = plist::Dictionary::new();
        config.insert("maxParticles".to_owned(), plist::Value::Integer(120.into()));
        config.insert("textureFileName".to_owned(), plist::Value::String("textures/fire.png".to_owned()));
        plist::Value::Dictionary(config).to_file_binary(&particle).unwrap();

        let resolved = resolve_references(ReferenceKind::Particle, &particle);
        assert_eq!(resolved.paths, vec![root.path().join("textures/fire.png")]);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn binary_font_warns() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let font = write_file(root.path(), "score.fnt", [0x62, 0x70, 0x6c, 0xff, 0xfe]);
        let resolved = resolve_references(ReferenceKind::BitmapFont, &font);
        assert!(resolved.paths.is_empty());
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn unreadable_file_warns() {
        setup_logger();
        let resolved = resolve_references(ReferenceKind::Particle, Path::new("the/wrong/path/fire.plist"));
        assert!(resolved.paths.is_empty());
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn tile_map_inline_tileset_is_relative_to_map() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let map = write_file(
            root.path(),
            "maps/level.tmx",
            indoc! {r#"
                <?xml version="1.0" encoding="UTF-8"?>
                <map version="1.0" orientation="orthogonal" width="10" height="10" tilewidth="32" tileheight="32">
                  <tileset firstgid="1" name="ground" tilewidth="32" tileheight="32">
                    <image source="tiles/a.png" width="256" height="256"/>
                  </tileset>
                  <layer name="ground" width="10" height="10"><data encoding="csv">1,1</data></layer>
                </map>
            "#},
        );
        let resolved = resolve_references(ReferenceKind::TileMap, &map);
        assert_eq!(resolved.paths, vec![root.path().join("maps/tiles/a.png")]);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn tile_map_external_tileset_is_relative_to_tileset() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let map = write_file(
            root.path(),
            "maps/level.tmx",
            indoc! {r#"
                <map version="1.0">
                  <tileset firstgid="1" source="../tilesets/ext.tsx"/>
                </map>
            "#},
        );
        write_file(
            root.path(),
            "tilesets/ext.tsx",
            indoc! {r#"
                <tileset name="ext" tilewidth="32" tileheight="32">
                  <image source="b.png" width="64" height="64"/>
                </tileset>
            "#},
        );
        let resolved = resolve_references(ReferenceKind::TileMap, &map);
        assert_eq!(
            resolved.paths,
            vec![root.path().join("tilesets/ext.tsx"), root.path().join("tilesets/b.png")]
        );
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn tile_map_missing_external_tileset() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let map = write_file(root.path(), "level.tmx", r#"<map><tileset firstgid="1" source="missing.tsx"/></map>"#);
        let resolved = resolve_references(ReferenceKind::TileMap, &map);
        // The tileset itself is still a reference. The stager reports that it's missing.
        assert_eq!(resolved.paths, vec![root.path().join("missing.tsx")]);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn tile_map_broken_external_tileset() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let map = write_file(
            root.path(),
            "level.tmx",
            r#"<map><tileset firstgid="1" source="broken.tsx"/><tileset firstgid="9"><image source="c.png"/></tileset></map>"#,
        );
        write_file(root.path(), "broken.tsx", "<tileset><image source=");
        let resolved = resolve_references(ReferenceKind::TileMap, &map);
        assert_eq!(resolved.paths, vec![root.path().join("broken.tsx"), root.path().join("c.png")]);
        assert_eq!(resolved.warnings.len(), 1);
    }

    #[test]
    fn broken_tile_map() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let map = write_file(root.path(), "level.tmx", "<map><tileset");
        let resolved = resolve_references(ReferenceKind::TileMap, &map);
        assert!(resolved.paths.is_empty());
        assert_eq!(resolved.warnings.len(), 1);
    }
}
