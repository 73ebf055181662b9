use std::{fs, path::Path};

use cocoport_shared::{
    absolute_path,
    log::{info, trace, warn},
};
use roxmltree::Node;

use crate::{
    common::{parent_dir, parse_xml, validate_project_name, STUDIO_RESOURCE_FOLDER_NAME},
    descriptor::{DeclaredResources, FontFormat, ProjectDescriptor, ResourceKind, ResourceNode},
    Error, Result, Warning,
};

/// Parses the XML descriptor of a studio project.
///
/// Nodes without a `Name` are skipped and reported in `warnings`. Hidden nodes and node types that
/// don't carry resources are skipped silently.
pub fn parse_studio_descriptor(descriptor_path: impl AsRef<Path>, warnings: &mut Vec<Warning>) -> Result<ProjectDescriptor> {
    let descriptor_path = absolute_path(descriptor_path.as_ref())?;
    let malformed = |reason: &str| Error::MalformedDescriptor(descriptor_path.clone(), reason.to_owned());

    let content = fs::read_to_string(&descriptor_path).map_err(|err| malformed(&err.to_string()))?;
    let document = parse_xml(&content).map_err(|err| malformed(&err.to_string()))?;
    let root_element = document.root_element();

    let property_group = find_descendant(root_element, "PropertyGroup").ok_or_else(|| malformed("missing PropertyGroup element"))?;
    let name = property_group
        .attribute("Name")
        .filter(|name| !name.is_empty())
        .ok_or_else(|| malformed("missing project name in PropertyGroup"))?
        .to_owned();
    validate_project_name(&descriptor_path, &name)?;
    let version = property_group.attribute("Version").map(ToOwned::to_owned);
    info!(
        "Project Name : {name}, Studio Version : {}",
        version.as_deref().unwrap_or("unknown")
    );

    let resource_root = parent_dir(&descriptor_path).join(STUDIO_RESOURCE_FOLDER_NAME);
    if !resource_root.is_dir() {
        return Err(Error::ResourceRootMissing(resource_root));
    }

    let root_folder = find_descendant(root_element, "SolutionFolder")
        .and_then(|solution_folder| find_descendant(solution_folder, "Group"))
        .and_then(|group| find_descendant(group, "RootFolder"))
        .ok_or_else(|| malformed("missing SolutionFolder/Group/RootFolder element"))?;
    let nodes = parse_nodes(root_folder, &descriptor_path, warnings);

    Ok(ProjectDescriptor {
        path: descriptor_path,
        name,
        version,
        resources: DeclaredResources::Tree { root: resource_root, nodes },
    })
}

/// Returns the first element with the given tag name below `node` in document order.
fn find_descendant<'a, 'input>(node: Node<'a, 'input>, tag_name: &str) -> Option<Node<'a, 'input>> {
    node.descendants().skip(1).find(|descendant| descendant.has_tag_name(tag_name))
}

fn is_ignorable(node: &Node) -> bool {
    !node.is_element() || node.attribute("Name").is_some_and(|name| name.starts_with('.'))
}

fn parse_nodes(element: Node, descriptor_path: &Path, warnings: &mut Vec<Warning>) -> Vec<ResourceNode> {
    let mut nodes = Vec::new();
    for child in element.children() {
        if is_ignorable(&child) {
            continue;
        }

        let tag = child.tag_name().name();
        let Some(name) = child.attribute("Name").filter(|name| !name.is_empty()) else {
            let warning = Warning::InvalidNode {
                descriptor: descriptor_path.to_owned(),
                tag: tag.to_owned(),
                reason: "missing Name attribute".to_owned(),
            };
            warn!("{warning}");
            warnings.push(warning);
            continue;
        };

        let kind = match tag {
            "Folder" => ResourceKind::Folder(parse_nodes(child, descriptor_path, warnings)),
            "Project" => ResourceKind::SceneReference,
            "PlistInfo" => ResourceKind::PlistInfo,
            "Image" => ResourceKind::Image,
            "TTF" => ResourceKind::Font(FontFormat::TrueType),
            "Fnt" => ResourceKind::Font(FontFormat::Bitmap),
            "Audio" => ResourceKind::Audio,
            "PlistImageFolder" => ResourceKind::PlistImageFolder {
                plist_file: child.attribute("PListFile").map(ToOwned::to_owned),
                image: child.attribute("Image").map(ToOwned::to_owned),
            },
            "PlistParticleFile" => ResourceKind::Particle,
            "TmxFile" => ResourceKind::TileMap,
            _ => {
                trace!("Skipping node '{tag}' with name '{name}' because it doesn't declare a resource");
                continue;
            }
        };
        nodes.push(ResourceNode::new(name, kind));
    }
    nodes
}

#[cfg(test)]
mod tests {
    use std::fs;

    use cocoport_shared::indoc::indoc;
    use cocoport_test::{setup_logger, write_file};
    use tempdir::TempDir;

    use super::*;

    const DESCRIPTOR: &str = indoc! {r#"
        <Solution>
          <PropertyGroup Name="Demo" Version="3.10.0.0" Type="CocosStudio" />
          <SolutionFolder>
            <Group ctype="ResourceGroup">
              <RootFolder Name=".">
                <Folder Name="ui">
                  <Image Name="button.png" />
                  <PlistImageFolder Name="icons" PListFile="icons.plist" Image="icons.png" />
                  <Folder Name="empty" />
                </Folder>
                <Project Name="MainScene.csd" Type="Scene" />
                <PlistInfo Name="sheet.csi" />
                <TTF Name="arial.ttf" />
                <Fnt Name="score.fnt" />
                <Audio Name="jump.mp3" />
                <PlistParticleFile Name="fire.plist" />
                <TmxFile Name="level.tmx" />
                <Image Name=".DS_Store" />
                <Image Type="Broken" />
                <Unknown Name="whatever" />
              </RootFolder>
            </Group>
          </SolutionFolder>
        </Solution>
    "#};

    fn setup_project(descriptor: &str) -> (TempDir, std::path::PathBuf) {
        let root = TempDir::new("root").unwrap();
        fs::create_dir_all(root.path().join(STUDIO_RESOURCE_FOLDER_NAME)).unwrap();
        let descriptor_path = write_file(root.path(), "Demo.ccs", descriptor);
        (root, descriptor_path)
    }

    #[test]
    fn smoke() {
        setup_logger();
        let (root, descriptor_path) = setup_project(DESCRIPTOR);
        let mut warnings = Vec::new();
        let descriptor = parse_studio_descriptor(&descriptor_path, &mut warnings).unwrap();

        assert_eq!(descriptor.name, "Demo");
        assert_eq!(descriptor.version.as_deref(), Some("3.10.0.0"));
        let DeclaredResources::Tree { root: resource_root, nodes } = descriptor.resources else {
            panic!("expected a resource tree");
        };
        assert_eq!(resource_root, root.path().join(STUDIO_RESOURCE_FOLDER_NAME));
        assert_eq!(
            nodes,
            vec![
                ResourceNode::new(
                    "ui",
                    ResourceKind::Folder(vec![
                        ResourceNode::new("button.png", ResourceKind::Image),
                        ResourceNode::new(
                            "icons",
                            ResourceKind::PlistImageFolder {
                                plist_file: Some("icons.plist".to_owned()),
                                image: Some("icons.png".to_owned()),
                            }
                        ),
                        ResourceNode::new("empty", ResourceKind::Folder(Vec::new())),
                    ])
                ),
                ResourceNode::new("MainScene.csd", ResourceKind::SceneReference),
                ResourceNode::new("sheet.csi", ResourceKind::PlistInfo),
                ResourceNode::new("arial.ttf", ResourceKind::Font(FontFormat::TrueType)),
                ResourceNode::new("score.fnt", ResourceKind::Font(FontFormat::Bitmap)),
                ResourceNode::new("jump.mp3", ResourceKind::Audio),
                ResourceNode::new("fire.plist", ResourceKind::Particle),
                ResourceNode::new("level.tmx", ResourceKind::TileMap),
            ]
        );

        // Only the node without a name is reported. Hidden and unknown nodes are skipped silently.
        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], Warning::InvalidNode { tag, .. } if tag == "Image"));
    }

    #[test]
    fn resource_root_missing() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        let descriptor_path = write_file(root.path(), "Demo.ccs", DESCRIPTOR);
        let result = parse_studio_descriptor(&descriptor_path, &mut Vec::new());
        assert!(matches!(result, Err(Error::ResourceRootMissing(path)) if path == root.path().join(STUDIO_RESOURCE_FOLDER_NAME)));
    }

    #[test]
    fn resource_root_is_a_file() {
        setup_logger();
        let root = TempDir::new("root").unwrap();
        write_file(root.path(), STUDIO_RESOURCE_FOLDER_NAME, "not a directory");
        let descriptor_path = write_file(root.path(), "Demo.ccs", DESCRIPTOR);
        let result = parse_studio_descriptor(&descriptor_path, &mut Vec::new());
        assert!(matches!(result, Err(Error::ResourceRootMissing(_))));
    }

    #[test]
    fn missing_project_name() {
        setup_logger();
        let (_root, descriptor_path) = setup_project(indoc! {r#"
            <Solution>
              <PropertyGroup Version="3.10.0.0" />
              <SolutionFolder><Group><RootFolder Name="." /></Group></SolutionFolder>
            </Solution>
        "#});
        let result = parse_studio_descriptor(&descriptor_path, &mut Vec::new());
        assert!(matches!(result, Err(Error::MalformedDescriptor(_, _))));
    }

    #[test]
    fn project_name_must_be_a_folder_name() {
        setup_logger();
        for name in ["..", ".", "/some/dir", "My/Game"] {
            let (root, descriptor_path) = setup_project(&DESCRIPTOR.replace(r#"Name="Demo""#, &format!(r#"Name="{name}""#)));
            let result = parse_studio_descriptor(&descriptor_path, &mut Vec::new());
            assert!(matches!(result, Err(Error::MalformedDescriptor(_, _))), "'{name}' was accepted");
            assert!(root.path().join(STUDIO_RESOURCE_FOLDER_NAME).is_dir());
        }
    }

    #[test]
    fn missing_root_folder() {
        setup_logger();
        let (_root, descriptor_path) = setup_project(indoc! {r#"
            <Solution>
              <PropertyGroup Name="Demo" Version="3.10.0.0" />
              <SolutionFolder><Group /></SolutionFolder>
            </Solution>
        "#});
        let result = parse_studio_descriptor(&descriptor_path, &mut Vec::new());
        assert!(matches!(result, Err(Error::MalformedDescriptor(_, _))));
    }

    #[test]
    fn invalid_xml() {
        setup_logger();
        let (_root, descriptor_path) = setup_project("<Solution><PropertyGroup Name=\"Demo\">");
        let result = parse_studio_descriptor(&descriptor_path, &mut Vec::new());
        assert!(matches!(result, Err(Error::MalformedDescriptor(_, _))));
    }
}
