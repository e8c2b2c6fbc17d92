/// Template written by `linktag --init`.
pub fn generate_init_template() -> &'static str {
	r#"# linktag configuration
#
# Tags are applied in declaration order. Every tag whose hosts list a link's
# host rewrites it, each one starting from the previous tag's result.

# Stop looking for .linktag.toml files in parent directories.
root = true

# Print diagnostics (modifier failures, lifecycle notices) to stderr.
log = false

[[tags]]
name = "example-shop"
hosts = ["shop.example", "www.shop.example"]
query = { ref = "my-affiliate-id" }
replace = [{ from = "http:", to = "https:" }]
# Built-in modifiers: https, strip-fragment, strip-utm
# modify = "strip-utm"
"#
}
