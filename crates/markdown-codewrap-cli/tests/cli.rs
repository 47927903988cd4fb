use std::fs;

use predicates::prelude::*;
use tempfile::tempdir;

const CSS_FENCE: &str = "```css\na { color: red; }\n```\n";

fn cargo_bin() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("markdown-codewrap").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn renders_stdin_with_default_wrapper() {
    let temp = tempdir().unwrap();
    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path()).arg("-").write_stdin(CSS_FENCE);

    cmd.assert().success().stdout(
        "<div><pre><code class=\"language-css\">a { color: red; }\n</code></pre>\n\
         <button type=\"button\">Copy</button></div>",
    );
}

#[test]
fn renders_figure_layout_from_flags() {
    let temp = tempdir().unwrap();
    let doc = temp.path().join("doc.md");
    fs::write(&doc, CSS_FENCE).unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path())
        .arg(&doc)
        .args(["--wrap-tag", "figure", "--wrap-class", "codeblock"])
        .args(["--toolbar", "--toolbar-tag", "figcaption"])
        .args(["--toolbar-class", "codeblock-toolbar"])
        .args(["--toolbar-label-from", "language", "--uppercase-label"])
        .args(["--button-in-toolbar", "--copy-label", "Copy code"])
        .args(["--button-attr", "class=codeblock-button"])
        .arg("--inline-copy-handler");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with(
            "<figure class=\"codeblock\"><figcaption class=\"codeblock-toolbar\">CSS<button type=\"button\" \
             onclick=\"navigator.clipboard.writeText(this.parentElement.parentElement.querySelector('pre').innerText)\" \
             class=\"codeblock-button\">Copy code</button></figcaption><pre>",
        ))
        .stdout(predicate::str::ends_with("</code></pre>\n</figure>"));
}

#[test]
fn config_file_is_applied_and_flags_win() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("codewrap.toml");
    fs::write(
        &config,
        "[wrap]\ntag = \"section\"\nclass = \"from-config\"\n\n[copy_button]\nlabel = \"Grab\"\n",
    )
    .unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path())
        .arg("-")
        .arg("--config")
        .arg(&config)
        .args(["--wrap-class", "from-flag"])
        .write_stdin(CSS_FENCE);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("<section class=\"from-flag\"><pre>"))
        .stdout(predicate::str::ends_with(
            "<button type=\"button\">Grab</button></section>",
        ));
}

#[test]
fn discovers_config_in_working_directory() {
    let temp = tempdir().unwrap();
    fs::write(
        temp.path().join(".markdown-codewrap.toml"),
        "[copy_button]\nenabled = false\n",
    )
    .unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path()).arg("-").write_stdin(CSS_FENCE);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("<button").not());
}

#[test]
fn nest_wraps_repeatedly() {
    let temp = tempdir().unwrap();
    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path())
        .args(["-", "--nest", "2", "--no-copy-button"])
        .write_stdin(CSS_FENCE);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("<div><div><pre>"))
        .stdout(predicate::str::ends_with("</pre>\n</div></div>"));
}

#[test]
fn tag_names_pass_through_unchanged() {
    let temp = tempdir().unwrap();
    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path())
        .args(["-", "--wrap-tag", "my_tag", "--no-copy-button"])
        .write_stdin(CSS_FENCE);

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("<my_tag><pre>"))
        .stdout(predicate::str::ends_with("</my_tag>"));
}

#[test]
fn non_string_tag_in_config_is_reported() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("codewrap.toml");
    fs::write(&config, "[wrap]\ntag = 5\n").unwrap();

    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path())
        .arg("-")
        .arg("--config")
        .arg(&config)
        .write_stdin(CSS_FENCE);

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("wrap_tag"));
}

#[test]
fn missing_file_is_reported() {
    let temp = tempdir().unwrap();
    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path()).arg("missing.md");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unable to read markdown at: missing.md"));
}

#[test]
fn malformed_button_attr_is_rejected() {
    let temp = tempdir().unwrap();
    let mut cmd = cargo_bin();
    cmd.current_dir(temp.path())
        .args(["-", "--button-attr", "novalue"])
        .write_stdin(CSS_FENCE);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected KEY=VALUE"));
}
