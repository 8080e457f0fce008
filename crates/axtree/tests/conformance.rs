//! Behavior every extraction backend must reproduce, checked against
//! synthetic trees shaped like the host's accessibility hierarchy.

use axtree::{
    AxError, Element, ElementSnapshot as Node, Extractor, MemoryElement, Role, SearchLimits,
    TrackPatterns,
};
use pretty_assertions::assert_eq;

fn track_row(label: &str, controls: Vec<Node>) -> Node {
    Node::new(Role::LayoutItem).description(label).children(controls)
}

fn toggle(label: &str, value: &str) -> Node {
    Node::new(Role::CheckBox).description(label).value(value)
}

fn plugin_slots(names: &[&str]) -> Node {
    Node::new(Role::Group)
        .description("Audio Plug-ins")
        .children(names.iter().map(|n| Node::new(Role::Button).description(*n)))
}

/// Application root with a main window holding three tracks and an open
/// plugin window.
fn project() -> MemoryElement {
    let tracks = Node::new(Role::Group).description("Tracks").child(
        Node::new(Role::ScrollArea).child(
            Node::new(Role::LayoutArea).children([
                track_row(
                    "Track 1 \u{201C}Drums\u{201D}",
                    vec![
                        toggle("Mute", "0"),
                        toggle("Solo", "0"),
                        toggle("Record Enable", "0"),
                        Node::new(Role::Slider).description("Volume").value("80"),
                        Node::new(Role::Button).description("M"),
                        Node::new(Role::Button).description("S"),
                        plugin_slots(&["Channel EQ", "Compressor"]),
                    ],
                ),
                track_row(
                    "Track 2 \"Bass\"",
                    vec![
                        toggle("Mute", "1"),
                        toggle("Solo", "0"),
                        Node::new(Role::Slider).description("Volume").value("64"),
                        plugin_slots(&["ChromaVerb"]),
                    ],
                ),
                track_row(
                    "Track 3 \u{00AB}Keys\u{00BB}",
                    vec![toggle("Solo", "1"), toggle("Record Enable", "1")],
                ),
            ]),
        ),
    );

    let main = Node::new(Role::Window)
        .title("Song - Tracks")
        .child(
            Node::new(Role::Group)
                .description("Control Bar")
                .child(Node::new(Role::TextField).description("Tempo").value("120")),
        )
        .child(tracks);

    let plugin = Node::new(Role::Window).title("Channel EQ").child(
        Node::new(Role::Group).children([
            Node::new(Role::Slider).description("Gain").value(0.0),
            Node::new(Role::PopUpButton).description("Mode").value("Stereo"),
            Node::new(Role::TextField).description("Frequency").value("1000"),
            Node::new(Role::CheckBox).description("Bypass").value(false),
        ]),
    );

    MemoryElement::from(
        Node::new(Role::Application)
            .title("Logic Pro")
            .children([main, plugin]),
    )
}

#[test]
fn three_track_project() {
    let tracks = Extractor::default().extract_tracks(&project());

    assert_eq!(tracks.len(), 3);
    assert_eq!(
        tracks.iter().map(|t| t.index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    let drums = &tracks[0];
    assert_eq!(drums.track_number, 1);
    assert_eq!(drums.name, "Drums");
    assert!(!drums.muted);
    assert_eq!(drums.volume, 80);
    assert_eq!(drums.plugins, vec!["Channel EQ", "Compressor"]);

    let bass = &tracks[1];
    assert_eq!(bass.index, 1);
    assert_eq!(bass.track_number, 2);
    assert_eq!(bass.name, "Bass");
    assert!(bass.muted);
    assert!(!bass.solo);
    assert_eq!(bass.volume, 64);
    assert_eq!(bass.plugins, vec!["ChromaVerb"]);

    let keys = &tracks[2];
    assert_eq!(keys.name, "Keys");
    assert!(keys.solo);
    assert!(keys.record_enabled);
    assert_eq!(keys.volume, 0);
    assert!(keys.plugins.is_empty());
}

#[test]
fn extraction_is_deterministic() {
    let extractor = Extractor::default();
    let root = project();
    let first = serde_json::to_string(&extractor.extract_tracks(&root)).unwrap();
    let second = serde_json::to_string(&extractor.extract_tracks(&root)).unwrap();
    assert_eq!(first, second);

    let params_a = serde_json::to_string(&extractor.read_parameters(&root.windows())).unwrap();
    let params_b = serde_json::to_string(&extractor.read_parameters(&root.windows())).unwrap();
    assert_eq!(params_a, params_b);
}

#[test]
fn track_info_wire_shape() {
    let tracks = Extractor::default().extract_tracks(&project());
    let json = serde_json::to_value(&tracks[1]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "index": 1,
            "trackNumber": 2,
            "name": "Bass",
            "muted": true,
            "solo": false,
            "recordEnabled": false,
            "volume": 64,
            "plugins": ["ChromaVerb"],
        })
    );
}

#[test]
fn no_container_means_no_tracks() {
    let root = MemoryElement::from(
        Node::new(Role::Application).child(
            Node::new(Role::Window)
                .title("Welcome")
                .child(track_row("Track 1 \"Orphan\"", vec![])),
        ),
    );
    assert!(Extractor::default().extract_tracks(&root).is_empty());
}

#[test]
fn rows_beyond_the_depth_bound_are_ignored() {
    let mut buried = track_row("Track 2 \"Buried\"", vec![]);
    for _ in 0..3 {
        buried = Node::new(Role::Group).child(buried);
    }
    let root = MemoryElement::from(
        Node::new(Role::Application).child(
            Node::new(Role::Window).child(
                Node::new(Role::Group)
                    .description("Tracks")
                    .child(track_row("Track 1 \"Shallow\"", vec![]))
                    .child(buried),
            ),
        ),
    );

    let limits = SearchLimits {
        track_depth: 3,
        ..SearchLimits::default()
    };
    let shallow = Extractor::new(TrackPatterns::default(), limits).extract_tracks(&root);
    assert_eq!(shallow.len(), 1);
    assert_eq!(shallow[0].name, "Shallow");

    let deep = Extractor::default().extract_tracks(&root);
    assert_eq!(
        deep.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        vec!["Shallow", "Buried"]
    );
}

#[test]
fn localized_labels() {
    let root = MemoryElement::from(
        Node::new(Role::Application).child(
            Node::new(Role::Window).child(
                Node::new(Role::Group).description("Spuren").child(track_row(
                    "Spur 5 \u{201E}Streicher\u{201C}",
                    vec![
                        toggle("Stumm", "1"),
                        Node::new(Role::Slider).description("Lautstärke").value(90.0),
                    ],
                )),
            ),
        ),
    );

    let tracks = Extractor::default().extract_tracks(&root);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].track_number, 5);
    assert_eq!(tracks[0].name, "Streicher");
    assert!(tracks[0].muted);
    assert_eq!(tracks[0].volume, 90);
}

#[test]
fn parameters_of_the_open_plugin_window() {
    let root = project();
    let windows = root.windows();
    let params = Extractor::default().read_parameters(&windows[1..]);

    let summary: Vec<(String, String, Role)> = params
        .into_iter()
        .map(|p| (p.name, p.value, p.role))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Gain".to_string(), "0".to_string(), Role::Slider),
            ("Mode".to_string(), "Stereo".to_string(), Role::PopUpButton),
            ("Frequency".to_string(), "1000".to_string(), Role::TextField),
        ]
    );
}

#[test]
fn parameter_search_spans_all_windows() {
    let root = project();
    let params = Extractor::default().read_parameters(&root.windows());
    let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
    assert!(names.contains(&"Tempo"));
    assert!(names.contains(&"Gain"));
    assert!(!names.contains(&"Bypass"));
}

#[test]
fn write_parameter_by_exact_name() {
    let root = project();
    let extractor = Extractor::default();

    let done = extractor
        .write_parameter(&root.windows(), "frequency", "2000")
        .unwrap();
    assert_eq!(done.name, "Frequency");
    assert_eq!(done.value, "2000");

    let params = extractor.read_parameters(&root.windows()[1..]);
    assert_eq!(params[2].value, "2000");
}

#[test]
fn write_parameter_failures() {
    let root = project();
    let extractor = Extractor::default();
    let windows = root.windows();

    assert!(matches!(
        extractor.write_parameter(&windows, "Gain", "loud"),
        Err(AxError::TypeMismatch { .. })
    ));
    // Pop-up buttons are not writable through value assignment.
    assert!(matches!(
        extractor.write_parameter(&windows, "Mode", "Mono"),
        Err(AxError::ParameterNotFound(name)) if name == "Mode"
    ));
    // Substrings do not match.
    assert!(matches!(
        extractor.write_parameter(&windows, "Freq", "10"),
        Err(AxError::ParameterNotFound(_))
    ));
}

#[test]
fn duplicate_labels_first_in_preorder_wins() {
    let root = MemoryElement::from(
        Node::new(Role::Application).children([
            Node::new(Role::Window)
                .child(Node::new(Role::Group).child(Node::new(Role::Slider).description("Mix").value(0.1))),
            Node::new(Role::Window).child(Node::new(Role::Slider).description("Mix").value(0.2)),
        ]),
    );

    Extractor::default()
        .write_parameter(&root.windows(), "Mix", "0.9")
        .unwrap();

    let params = Extractor::default().read_parameters(&root.windows());
    assert_eq!(params[0].value, "0.9");
    assert_eq!(params[1].value, "0.2");
}

#[test]
fn tempo_is_a_writable_text_field() {
    let root = project();
    let done = Extractor::default()
        .write_parameter(&root.windows(), "Tempo", "128")
        .unwrap();
    assert_eq!(done.role, Role::TextField);
    assert_eq!(done.value, "128");
}
