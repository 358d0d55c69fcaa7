//! Embedded HTML for the web UI.

use crate::targets::join_target_list;
use crate::types::Target;

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; background: #f4f4f9; margin: 0; padding: 20px; }
    .container { max-width: 800px; margin: auto; background: #fff; padding: 20px;
                 border-radius: 8px; box-shadow: 0 2px 5px rgba(0,0,0,0.1); }
    h1 { text-align: center; color: #333; }
    .disclaimer { font-size: 0.8em; color: #777; margin-bottom: 20px; border: 1px solid #ccc;
                  padding: 10px; background-color: #f9f9f9; border-radius: 5px; }
    form label { display: block; margin-bottom: 5px; }
    textarea { width: 100%; padding: 10px; border: 1px solid #ccc; border-radius: 4px;
               box-sizing: border-box; }
    button { background-color: #007BFF; color: #fff; border: none; padding: 10px 20px;
             border-radius: 4px; cursor: pointer; }
    button:hover { background-color: #0056b3; }
    #log { background-color: #e9ecef; padding: 10px; white-space: pre-wrap; font-family: monospace;
           border-radius: 4px; height: 400px; overflow-y: auto; }
    #log p { margin: 2px 0; }
    #log .open { color: green; font-weight: bold; }
    #log .warn { color: #b35c00; }
    a { display: inline-block; margin-top: 20px; text-decoration: none; color: #007BFF; }
    a:hover { text-decoration: underline; }
"#;

/// Landing page with the target form.
pub fn index_page() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Camera Port Scan</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
    <h1>Camera Port Scan</h1>
    <div class="disclaimer">
        <p><strong>Warning:</strong> this tool is provided for education and for testing
        networks you are authorized to assess. You alone are responsible for how you use it.</p>
    </div>
    <form action="/scan" method="post">
        <label for="ips">Addresses to scan (one per line):</label>
        <textarea id="ips" name="ips" rows="10" cols="50"></textarea>
        <br><br>
        <button type="submit">Start scan</button>
    </form>
</div>
</body>
</html>
"#
    )
}

/// Progress page that follows `/scan_stream` for `targets` over Server-Sent Events.
pub fn progress_page(targets: &[Target]) -> String {
    let ips = js_string(&join_target_list(targets));
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Scan Progress - Camera Port Scan</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
    <h1>Scan Progress</h1>
    <div id="log"></div>
    <a href="/">Back</a>
</div>
<script>
    const log = document.getElementById("log");
    const source = new EventSource("/scan_stream?" + new URLSearchParams({{ ips: {ips} }}));
    function append(text, cls) {{
        const p = document.createElement("p");
        p.textContent = text;
        if (cls) p.className = cls;
        log.appendChild(p);
        log.scrollTop = log.scrollHeight;
    }}
    ["target_start", "port_probe_start", "target_no_open_ports", "target_separator",
     "scan_complete", "summary"].forEach(function (name) {{
        source.addEventListener(name, function (e) {{ append(e.data); }});
    }});
    source.addEventListener("port_open", function (e) {{ append(e.data, "open"); }});
    source.addEventListener("deadline_reached", function (e) {{ append(e.data, "warn"); }});
    source.addEventListener("terminal", function (e) {{
        append(e.data);
        source.close();
    }});
    source.onerror = function (e) {{
        console.error("SSE connection error", e);
        source.close();
    }};
</script>
</body>
</html>
"#
    )
}

/// JSON string literal safe to embed inside a `<script>` element.
fn js_string(s: &str) -> String {
    serde_json::to_string(s)
        .unwrap_or_else(|_| String::from("\"\""))
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
